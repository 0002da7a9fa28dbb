use opjson::{EncodeError, describe, to_string, to_vec};
use opjson_testhelpers::test;

#[test]
fn integers() {
    assert_eq!(to_string(&i64::MIN).unwrap(), "-9223372036854775808");
    assert_eq!(to_string(&u64::MAX).unwrap(), "18446744073709551615");
    assert_eq!(to_string(&[0i8, -128, 127]).unwrap(), "[0,-128,127]");
    assert_eq!(to_string(&vec![1usize, 2]).unwrap(), "[1,2]");
}

#[test]
fn floats_round_trip() {
    let values = [
        0.0,
        -0.0,
        0.1,
        1.5,
        -2.25,
        1e21,
        1e-7,
        123456.789,
        f64::MIN_POSITIVE,
        f64::MAX,
        5e-324,
        std::f64::consts::PI,
    ];
    for value in values {
        let json = to_string(&value).unwrap();
        assert_eq!(json.parse::<f64>().unwrap(), value, "{json}");
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_number(), "{json}");
    }

    for value in [0.1f32, 3.4028235e38, 1e-45, 16777216.0] {
        let json = to_string(&value).unwrap();
        assert_eq!(json.parse::<f32>().unwrap(), value, "{json}");
    }
}

#[test]
fn integral_floats_have_no_fraction() {
    assert_eq!(to_string(&1.0f64).unwrap(), "1");
    assert_eq!(to_string(&-3.0f32).unwrap(), "-3");
    assert_eq!(to_string(&100.0f64).unwrap(), "100");
}

describe! {
    struct Sample {
        id: u32,
        value: f64,
    }
}

#[test]
fn non_finite_floats_are_rejected() {
    for (value, message) in [
        (f64::NAN, "NaN"),
        (f64::INFINITY, "+Inf"),
        (f64::NEG_INFINITY, "-Inf"),
    ] {
        let err = to_vec(&Sample { id: 1, value }).unwrap_err();
        assert_eq!(err.code(), "json::unsupported_value");
        match err {
            EncodeError::UnsupportedValue {
                type_name,
                message: got,
            } => {
                assert_eq!(type_name, "f64");
                assert_eq!(got, message);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    assert!(to_vec(&vec![1.0f32, f32::NAN]).is_err());
    assert!(to_vec(&Some(f32::INFINITY)).is_err());
}
