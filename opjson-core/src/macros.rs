/// Declares a struct together with its [`Describe`](crate::Describe)
/// implementation.
///
/// Fields accept one `#[json(...)]` attribute, written after any doc
/// comments, holding a comma-separated list of:
///
/// - `omitempty`: skip the field when its value is empty
/// - `string`: encode a scalar as a JSON string (`42` becomes `"42"`)
/// - `rename = "key"`: use `key` as the JSON key
/// - `embed`: promote the fields of a nested struct into this object; a
///   struct behind `Option`, `Box` or another pointer contributes no fields
///   when absent
/// - `skip`: never encode the field
///
/// ```
/// use opjson_core::describe;
///
/// describe! {
///     #[derive(Debug, Default)]
///     pub struct Account {
///         /// Login name.
///         pub name: String,
///         #[json(rename = "id", string)]
///         pub account_id: u64,
///         #[json(omitempty)]
///         pub aliases: Vec<String>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! describe {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $(#[json($($attr:ident $(= $value:literal)?),* $(,)?)])?
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[doc = $doc])*
                $fvis $field: $ty,
            )*
        }

        unsafe impl $crate::Describe for $name {
            const SHAPE: &'static $crate::Shape = &const {
                const FIELDS: &[$crate::Field] = &[
                    $(
                        $crate::Field::new(
                            ::core::stringify!($field),
                            ::core::mem::offset_of!($name, $field),
                            $crate::shape_of::<$ty>,
                        )
                        $($(.$attr($($value)?))*)?
                    ),*
                ];
                $crate::Shape::new::<$name>($crate::Kind::Struct($crate::StructDef {
                    fields: FIELDS,
                }))
            };
        }
    };
}

/// Implements [`Describe`](crate::Describe) for types that write their own
/// JSON through [`MarshalJson`](crate::MarshalJson).
#[macro_export]
macro_rules! describe_marshaler {
    ($($ty:ty),+ $(,)?) => {
        $(
            unsafe impl $crate::Describe for $ty {
                const SHAPE: &'static $crate::Shape = &const {
                    $crate::Shape::new::<$ty>($crate::Kind::Marshaler(
                        $crate::MarshalerDef::of::<$ty>(),
                    ))
                };
            }
        )+
    };
}

/// Implements [`Describe`](crate::Describe) for types that render as text
/// through [`MarshalText`](crate::MarshalText).
#[macro_export]
macro_rules! describe_text_marshaler {
    ($($ty:ty),+ $(,)?) => {
        $(
            unsafe impl $crate::Describe for $ty {
                const SHAPE: &'static $crate::Shape = &const {
                    $crate::Shape::new::<$ty>($crate::Kind::TextMarshaler(
                        $crate::TextMarshalerDef::of::<$ty>(),
                    ))
                };
            }
        )+
    };
}

/// Implements [`Describe`](crate::Describe) for types that have no JSON
/// form. Encoding them fails with an unsupported-type error.
#[macro_export]
macro_rules! describe_opaque {
    ($($ty:ty),+ $(,)?) => {
        $(
            unsafe impl $crate::Describe for $ty {
                const SHAPE: &'static $crate::Shape =
                    &const { $crate::Shape::new::<$ty>($crate::Kind::Opaque) };
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use crate::{Describe, FieldFlags, Kind, PtrConst, Shape};
    use opjson_testhelpers::test;

    describe! {
        struct Sample {
            /// A documented field.
            plain: u32,
            #[json(omitempty, rename = "renamed")]
            flagged: String,
            #[json(string)]
            quoted: i64,
            #[json(skip)]
            hidden: bool,
        }
    }

    fn fields(shape: &'static Shape) -> &'static [crate::Field] {
        match shape.kind {
            Kind::Struct(def) => def.fields,
            _ => panic!("expected a struct, got {}", shape.kind.label()),
        }
    }

    #[test]
    fn field_attributes_become_flags() {
        let fields = fields(Sample::SHAPE);
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].name, "plain");
        assert!(fields[0].flags.is_empty());
        assert_eq!(fields[1].name, "renamed");
        assert!(fields[1].has(FieldFlags::OMIT_EMPTY));
        assert!(fields[2].has(FieldFlags::STRING));
        assert!(fields[3].has(FieldFlags::SKIP));
    }

    #[test]
    fn offsets_reach_field_memory() {
        let sample = Sample {
            plain: 5,
            flagged: String::from("x"),
            quoted: -3,
            hidden: true,
        };
        let base = PtrConst::new(&sample);
        let fields = fields(Sample::SHAPE);
        let plain = unsafe { base.field(fields[0].offset).read::<u32>() };
        let quoted = unsafe { base.field(fields[2].offset).read::<i64>() };
        assert_eq!((plain, quoted), (5, -3));
        assert!(fields[1].shape().is(String::SHAPE));
        assert!(!unsafe { fields[1].shape().is_zero(base.field(fields[1].offset)) });
        assert!(sample.hidden);
    }

    #[test]
    fn empty_values_are_zero() {
        let none: Option<u8> = None;
        let empty: Vec<String> = Vec::new();
        let zero = 0.0f64;
        unsafe {
            assert!(Option::<u8>::SHAPE.is_zero(PtrConst::new(&none)));
            assert!(Vec::<String>::SHAPE.is_zero(PtrConst::new(&empty)));
            assert!(f64::SHAPE.is_zero(PtrConst::new(&zero)));
            assert!(!<[u8; 2]>::SHAPE.is_zero(PtrConst::new(&[0u8, 0])));
        }
    }

    #[repr(transparent)]
    struct Meters(f64);

    // SAFETY: a transparent wrapper has the layout of its only field.
    unsafe impl Describe for Meters {
        const SHAPE: &'static Shape =
            &const { Shape::new::<Meters>(Kind::Scalar(crate::ScalarKind::F64)) };
    }

    #[test]
    fn hand_written_impl_describes_a_newtype() {
        let length = Meters(0.0);
        let shape = crate::DynDescribe::shape(&length);
        assert!(shape.is(Meters::SHAPE));
        assert!(shape.type_name().ends_with("Meters"));
        assert!(unsafe { shape.is_zero(PtrConst::new(&length)) });
        assert!(!unsafe { shape.is_zero(PtrConst::new(&Meters(1.5))) });
    }
}
