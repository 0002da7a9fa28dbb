//! A small bitflags macro for field flag sets.

/// Defines a flag set backed by an integer.
///
/// The generated type is `Copy`, comparable and hashable, and offers
/// `empty`, `is_empty`, `contains`, `union`, `bits` and `|`.
#[macro_export]
#[doc(hidden)]
macro_rules! __opjson_bitflags {
    (
        $(#[$outer:meta])*
        $vis:vis struct $Name:ident : $T:ty {
            $(
                $(#[$inner:meta])*
                const $FLAG:ident = $value:expr;
            )*
        }
    ) => {
        $(#[$outer])*
        #[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        $vis struct $Name($T);

        impl $Name {
            $(
                $(#[$inner])*
                pub const $FLAG: Self = Self($value);
            )*

            /// No flags set.
            #[inline]
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Returns `true` if no flags are set.
            #[inline]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Returns `true` if every flag in `other` is also set in `self`.
            #[inline]
            pub const fn contains(self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }

            /// Returns the union of `self` and `other`.
            #[inline]
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Returns the raw bits.
            #[inline]
            pub const fn bits(self) -> $T {
                self.0
            }
        }

        impl ::core::fmt::Debug for $Name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                let mut first = true;
                $(
                    if self.contains(Self::$FLAG) {
                        if !first {
                            f.write_str(" | ")?;
                        }
                        f.write_str(stringify!($FLAG))?;
                        first = false;
                    }
                )*
                if first {
                    f.write_str("(empty)")?;
                }
                Ok(())
            }
        }

        impl ::core::ops::BitOr for $Name {
            type Output = Self;

            #[inline]
            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }
    };
}
