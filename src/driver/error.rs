//! Error types for the HLCDC layer engine
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Layer description and initialization failures
//! - [`DmaError`]: Descriptor pool and release queue shortages
//! - [`IoError`]: Hardware handshakes and call sequencing
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most layer methods.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and initialization errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Layer already initialized
    AlreadyInitialized,
    /// Layer used before `init`
    NotInitialized,
    /// Plane count outside `1..=MAX_PLANES`
    InvalidPlaneCount,
    /// Configuration register count outside `1..=MAX_CONFIGS`
    InvalidConfigCount,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::AlreadyInitialized => "already initialized",
            ConfigError::NotInitialized => "not initialized",
            ConfigError::InvalidPlaneCount => "invalid plane count",
            ConfigError::InvalidConfigCount => "invalid configuration register count",
        }
    }
}

// =============================================================================
// DMA Errors
// =============================================================================

/// Descriptor and release bookkeeping errors
///
/// Both variants are transient: the resources come back as the hardware
/// retires flips and the release task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Not enough free descriptors for a new flip
    Exhausted,
    /// Deferred release queue cannot absorb another flip
    ReleaseQueueFull,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DmaError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DmaError::Exhausted => "descriptor pool exhausted",
            DmaError::ReleaseQueueFull => "release queue full",
        }
    }
}

// =============================================================================
// I/O Errors
// =============================================================================

/// Runtime hardware and sequencing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// Operation timed out
    Timeout,
    /// Invalid state for operation (e.g., update already open)
    InvalidState,
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IoError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IoError::Timeout => "operation timed out",
            IoError::InvalidState => "invalid state for operation",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match layer.update_start() {
///     Err(e) if e.is_transient() => { /* retry next frame */ }
///     Err(Error::Io(IoError::InvalidState)) => { /* commit or roll back first */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// DMA error
    Dma(DmaError),
    /// I/O error
    Io(IoError),
}

impl Error {
    /// True if retrying the operation later may succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Error::Dma(_))
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Dma(e) => write!(f, "dma: {}", e.as_str()),
            Error::Io(e) => write!(f, "io: {}", e.as_str()),
        }
    }
}

// From impls for automatic conversion
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<DmaError> for Error {
    fn from(e: DmaError) -> Self {
        Error::Dma(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

/// Result type alias for layer operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for DMA operations
pub type DmaResult<T> = core::result::Result<T, DmaError>;

/// Result type alias for I/O operations
pub type IoResult<T> = core::result::Result<T, IoError>;
