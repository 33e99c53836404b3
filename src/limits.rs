/// Default maximum nesting depth for parsing and serializing.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default maximum nesting depth of values skipped or captured without a model.
pub const DEFAULT_MAX_SKIP_DEPTH: usize = 64;

/// Parse-time configuration.
///
/// Limits are enforced deterministically while reading; nothing depends on timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum nesting depth of the model traversal.
    pub max_depth: usize,
    /// Maximum nesting depth of unmodelled values (excess fields, wire sinks).
    pub max_skip_depth: usize,
    /// After a fixed-size string overflows, keep reading the token so the reader is left
    /// after its closing delimiter.
    pub consume_overflowing_strings: bool,
    /// Accept JSON numbers with redundant leading zeros such as `007`.
    pub lenient_leading_zeros: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseOptions {
    /// Defaults: depth 256, skip depth 64, overflowing strings consumed, strict numbers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_skip_depth: DEFAULT_MAX_SKIP_DEPTH,
            consume_overflowing_strings: true,
            lenient_leading_zeros: false,
        }
    }

    /// Set [`ParseOptions::max_depth`].
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set [`ParseOptions::max_skip_depth`].
    #[must_use]
    pub const fn with_max_skip_depth(mut self, max_skip_depth: usize) -> Self {
        self.max_skip_depth = max_skip_depth;
        self
    }

    /// Set [`ParseOptions::consume_overflowing_strings`].
    #[must_use]
    pub const fn with_consume_overflowing_strings(mut self, consume: bool) -> Self {
        self.consume_overflowing_strings = consume;
        self
    }

    /// Set [`ParseOptions::lenient_leading_zeros`].
    #[must_use]
    pub const fn with_lenient_leading_zeros(mut self, lenient: bool) -> Self {
        self.lenient_leading_zeros = lenient;
        self
    }
}

/// Serialize-time configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Maximum nesting depth.
    pub max_depth: usize,
    /// Fractional digits for floats without a `float_decimals` decoration; `None` writes the
    /// shortest representation that round-trips.
    pub float_decimals: Option<u8>,
    /// Write `/` as `\/` in JSON strings.
    pub escape_solidus: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteOptions {
    /// Defaults: depth 256, shortest floats, `/` unescaped.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            float_decimals: None,
            escape_solidus: false,
        }
    }

    /// Set [`WriteOptions::float_decimals`].
    #[must_use]
    pub const fn with_float_decimals(mut self, decimals: Option<u8>) -> Self {
        self.float_decimals = decimals;
        self
    }

    /// Set [`WriteOptions::escape_solidus`].
    #[must_use]
    pub const fn with_escape_solidus(mut self, escape: bool) -> Self {
        self.escape_solidus = escape;
        self
    }
}
