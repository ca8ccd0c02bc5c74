/// Declares an ARI enum whose variants travel as fixed names on the wire.
///
/// ARI spells the same concept differently per resource (`StasisStart`, `NOT_INUSE`,
/// `unpause`), so each variant names its exact wire spelling. The macro emits:
///
/// - the enum (`#[non_exhaustive]`, `Copy`, `Hash`)
/// - `as_str()`, `Display` and `AsRef<str>` giving the wire name
/// - `Serialize` as the wire name, so request bodies can hold the enum directly
/// - `FromStr`, matching wire names without regard to ASCII case
/// - the parse error type, displayed as `unknown <what>: <input>`
///
/// ```ignore
/// define_wire_enum! {
///     parse_error: ParseHoldStateError("hold state"),
///     /// Whether a channel is parked on hold.
///     pub enum HoldState {
///         Held => "HELD",
///         Released => "RELEASED",
///     }
/// }
/// ```
macro_rules! define_wire_enum {
    (
        parse_error: $Err:ident($what:literal),
        $(#[$enum_meta:meta])*
        $vis:vis enum $Name:ident {
            $(
                $(#[$var_meta:meta])*
                $variant:ident => $wire:literal
            ),+ $(,)?
        }
    ) => {
        #[doc = concat!("Error returned when a string is not a known ", $what, ".")]
        #[derive(Debug, Clone, PartialEq, Eq)]
        $vis struct $Err(pub String);

        impl std::fmt::Display for $Err {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!("unknown ", $what, ": {}"), self.0)
            }
        }

        impl std::error::Error for $Err {}

        $(#[$enum_meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[non_exhaustive]
        #[allow(missing_docs)]
        $vis enum $Name {
            $(
                $(#[$var_meta])*
                $variant,
            )+
        }

        impl $Name {
            /// Name as ARI spells it.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $Name::$variant => $wire, )+
                }
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl serde::Serialize for $Name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl std::str::FromStr for $Name {
            type Err = $Err;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($wire) {
                        return Ok($Name::$variant);
                    }
                )+
                Err($Err(s.to_string()))
            }
        }
    };
}
