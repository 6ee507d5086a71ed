// -----------------------------------------------------------------------------
// ----- GatewayState ----------------------------------------------------------

/// Lifecycle of the orchestrator. Transitions are linear:
/// `Stopped -> Starting -> Running -> Stopping -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

// -----------------------------------------------------------------------------
// ----- GatewayState: Static --------------------------------------------------

impl GatewayState {
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayState::Stopped => "stopped",
            GatewayState::Starting => "starting",
            GatewayState::Running => "running",
            GatewayState::Stopping => "stopping",
        }
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
