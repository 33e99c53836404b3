use core::fmt;

use crate::path::Path;

/// Which direction of the codec produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reading a wire document into a model.
    Parse,
    /// Writing a model to a wire document.
    Serialize,
}

/// Syntax-level failure reported by a wire reader.
///
/// These are delegated verbatim from the backend (JSON, CBOR or DOM) and carried inside
/// [`ErrorCode::Read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReadError {
    /// The input ended in the middle of a value.
    UnexpectedEnd,
    /// A byte that cannot start or continue the current token.
    UnexpectedSymbol,
    /// Malformed `null` literal.
    IllformedNull,
    /// Malformed boolean literal.
    IllformedBool,
    /// Malformed number token.
    IllformedNumber,
    /// Malformed string (bad escape, control character, invalid UTF-8).
    IllformedString,
    /// Malformed array framing (missing separator, trailing comma).
    IllformedArray,
    /// Malformed object/map framing (missing colon, non-string key, trailing comma).
    IllformedObject,
    /// Non-whitespace input after the top-level value.
    ExcessData,
    /// A number does not fit any integer type the reader can produce.
    NumberOutOfRange,
    /// A fractional or exponent number was found where an integer is stored.
    FloatInIntegerStorage,
    /// Skipping or capturing exceeded the configured nesting limit.
    NestingTooDeep,
    /// A wire sink ran out of room while capturing raw bytes.
    SinkOverflow,
    /// The item is valid on the wire but has no mapping (byte strings, `undefined`, indefinite text).
    UnsupportedItem,
}

impl ReadError {
    const fn message(self) -> &'static str {
        match self {
            Self::UnexpectedEnd => "unexpected end of data",
            Self::UnexpectedSymbol => "unexpected symbol",
            Self::IllformedNull => "ill-formed null",
            Self::IllformedBool => "ill-formed boolean",
            Self::IllformedNumber => "ill-formed number",
            Self::IllformedString => "ill-formed string",
            Self::IllformedArray => "ill-formed array",
            Self::IllformedObject => "ill-formed object",
            Self::ExcessData => "excess data after value",
            Self::NumberOutOfRange => "numeric value is out of storage type range",
            Self::FloatInIntegerStorage => "float value in integer storage",
            Self::NestingTooDeep => "skipping stack overflow",
            Self::SinkOverflow => "wire sink overflow",
            Self::UnsupportedItem => "unsupported wire item",
        }
    }
}

/// Failure reported by a wire writer or its output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum WriteError {
    /// The caller-provided output buffer is full.
    BufferFull,
    /// Growing the output buffer failed.
    AllocationFailed,
    /// JSON cannot represent NaN or infinities.
    NonFiniteFloat,
    /// A definite-length container received a different number of items than announced.
    LengthMismatch,
}

impl WriteError {
    const fn message(self) -> &'static str {
        match self {
            Self::BufferFull => "output buffer is full",
            Self::AllocationFailed => "output allocation failed",
            Self::NonFiniteFloat => "non-finite float cannot be written",
            Self::LengthMismatch => "container length does not match its header",
        }
    }
}

/// A structured code identifying why a parse or serialize call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCode {
    /// A fixed-capacity destination (string, array) ran out of room.
    FixedSizeContainerOverflow,
    /// A non-number token where a number is stored.
    NonNumericInNumeric,
    /// A non-boolean token where a boolean is stored.
    NonBoolInBool,
    /// A non-string token where a string is stored.
    NonStringInString,
    /// A non-array token where an array-like value is stored.
    NonArrayInArrayLike,
    /// A non-map token where a map-like value or object is stored.
    NonMapInMapLike,
    /// A non-array token for an object declared as array-destructured.
    NonArrayInDestructured,
    /// `null` where the destination is not optional.
    NullInNonOptional,
    /// A number does not fit the destination type.
    NumberOutOfRange,
    /// A wire key matches no declared field and excess fields are not allowed.
    ExcessField,
    /// The wire array length differs from the number of destructured fields.
    ArrayDestructuringMismatch,
    /// A field or map key appeared twice.
    DuplicateKey,
    /// A streaming consumer rejected an item or its finalization.
    DataConsumerError,
    /// A streaming producer reported an error.
    DataProducerError,
    /// A transformer failed to convert between stored and wire form.
    TransformerError,
    /// A validator rejected the value; see [`Error::validation`].
    SchemaValidation,
    /// The configured nesting depth was exceeded.
    DepthLimitExceeded,
    /// A wire sink holds bytes captured from a different wire format.
    WireSinkFormatMismatch,
    /// Syntax error from the wire reader.
    Read(ReadError),
    /// Failure from the wire writer.
    Write(WriteError),
}

/// Validation failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    /// Number outside a `range` validator.
    NumberOutOfRange,
    /// String length outside `min_length`/`max_length`.
    StringLengthOutOfRange,
    /// Array item count outside `min_items`/`max_items`.
    ArrayItemsCountOutOfRange,
    /// Required object fields were not present.
    MissingRequiredFields,
    /// Map entry count outside `min_properties`/`max_properties`.
    MapPropertiesCountOutOfRange,
    /// Map key length outside `min_key_length`/`max_key_length`.
    MapKeyLengthOutOfRange,
    /// Value differs from a `constant` or is not one of `enum_values`.
    WrongConstantValue,
    /// Map key not listed in `allowed_keys`.
    MapKeyNotAllowed,
    /// Map key listed in `forbidden_keys`.
    MapKeyForbidden,
    /// A key from `required_keys` was missing.
    MapMissingRequiredKey,
    /// A user-supplied check returned `false`.
    UserValidatorFailed,
    /// An excess field listed in `forbidden_fields` was present.
    ForbiddenField,
}

impl SchemaError {
    /// Stable snake-case name used in rendered messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NumberOutOfRange => "number_out_of_range",
            Self::StringLengthOutOfRange => "string_length_out_of_range",
            Self::ArrayItemsCountOutOfRange => "array_items_count_out_of_range",
            Self::MissingRequiredFields => "missing_required_fields",
            Self::MapPropertiesCountOutOfRange => "map_properties_count_out_of_range",
            Self::MapKeyLengthOutOfRange => "map_key_length_out_of_range",
            Self::WrongConstantValue => "wrong_constant_value",
            Self::MapKeyNotAllowed => "map_key_not_allowed",
            Self::MapKeyForbidden => "map_key_forbidden",
            Self::MapMissingRequiredKey => "map_missing_required_key",
            Self::UserValidatorFailed => "user_defined_fn_validator_error",
            Self::ForbiddenField => "forbidden_fields",
        }
    }
}

/// The first validator that rejected a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationFailure {
    /// What was violated.
    pub kind: SchemaError,
    /// Position of the validator among the decorations evaluated for the node
    /// (field decorations first, then the type's own decorations).
    pub validator: usize,
    /// Short name of the validator, e.g. `range` or `max_length`.
    pub name: &'static str,
}

impl ValidationFailure {
    /// Construct a failure record.
    #[inline]
    #[must_use]
    pub const fn new(kind: SchemaError, validator: usize, name: &'static str) -> Self {
        Self {
            kind,
            validator,
            name,
        }
    }
}

/// A parse or serialize error with a stable code, wire position, and structural path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// Parse or serialize.
    pub kind: ErrorKind,
    /// The error code.
    pub code: ErrorCode,
    /// Byte offset into the input (parse) or output (serialize) where the error was detected.
    pub offset: usize,
    /// Validator details when `code` is [`ErrorCode::SchemaValidation`].
    pub validation: Option<ValidationFailure>,
    /// Route from the document root to the failing node.
    pub path: Path,
}

impl Error {
    /// Construct a parse error at `offset` with an empty path.
    #[inline]
    #[must_use]
    pub const fn parse(code: ErrorCode, offset: usize) -> Self {
        Self {
            kind: ErrorKind::Parse,
            code,
            offset,
            validation: None,
            path: Path::new(),
        }
    }

    /// Construct a serialize error at output `offset` with an empty path.
    #[inline]
    #[must_use]
    pub const fn serialize(code: ErrorCode, offset: usize) -> Self {
        Self {
            kind: ErrorKind::Serialize,
            code,
            offset,
            validation: None,
            path: Path::new(),
        }
    }

    /// Returns true iff a validator rejected the value.
    #[inline]
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.code, ErrorCode::SchemaValidation)
    }

    /// The validation failure kind, if any.
    #[inline]
    #[must_use]
    pub fn schema_error(&self) -> Option<SchemaError> {
        self.validation.map(|v| v.kind)
    }
}

impl ErrorCode {
    pub(crate) const fn message(self) -> &'static str {
        match self {
            Self::FixedSizeContainerOverflow => "fixed-size container overflow",
            Self::NonNumericInNumeric => "non-numeric value in numeric storage",
            Self::NonBoolInBool => "non-boolean value in boolean storage",
            Self::NonStringInString => "non-string value in string storage",
            Self::NonArrayInArrayLike => "non-array value in array-like storage",
            Self::NonMapInMapLike => "non-map value in map-like storage",
            Self::NonArrayInDestructured => "non-array value in destructured object",
            Self::NullInNonOptional => "null in non-optional value",
            Self::NumberOutOfRange => "numeric value is out of storage type range",
            Self::ExcessField => "excess field",
            Self::ArrayDestructuringMismatch => "array destructuring length mismatch",
            Self::DuplicateKey => "duplicate key",
            Self::DataConsumerError => "data consumer error",
            Self::DataProducerError => "data producer error",
            Self::TransformerError => "transformer error",
            Self::SchemaValidation => "schema validation error",
            Self::DepthLimitExceeded => "nesting depth limit exceeded",
            Self::WireSinkFormatMismatch => "wire sink holds another wire format",
            Self::Read(e) => e.message(),
            Self::Write(e) => e.message(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            ErrorKind::Parse => "parse",
            ErrorKind::Serialize => "serialize",
        };
        write!(
            f,
            "{verb} failed at {} ({}): {}",
            self.offset,
            self.path,
            self.code.message()
        )?;
        if let Some(v) = self.validation {
            write!(
                f,
                ": validator #{} ({}) error: '{}'",
                v.validator,
                v.name,
                v.kind.as_str()
            )?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
