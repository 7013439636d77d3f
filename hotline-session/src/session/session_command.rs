/// Commands issued by the presentation layer against a running session.
#[derive(Debug)]
pub enum SessionCommand {
    /// Flip local audio track enablement.
    ToggleMute,

    /// Flip between cameras, when the capture device supports it.
    SwitchCamera,

    /// End the call and release every held resource.
    EndCall,
}
