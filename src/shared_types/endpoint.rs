// -----------------------------------------------------------------------------
// ----- Endpoint --------------------------------------------------------------

/// The two serial peers the gateway sits between. The front end is the ACM
/// command module speaking line-oriented ASCII; the back end is the STM32
/// game controller speaking one JSON object per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    FrontEnd,
    BackEnd,
}

// -----------------------------------------------------------------------------
// ----- Endpoint: Static ------------------------------------------------------

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::FrontEnd => "acm",
            Endpoint::BackEnd => "stm32",
        }
    }

    /// The transport a frame from this endpoint is translated towards.
    pub fn opposite(self) -> Endpoint {
        match self {
            Endpoint::FrontEnd => Endpoint::BackEnd,
            Endpoint::BackEnd => Endpoint::FrontEnd,
        }
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
