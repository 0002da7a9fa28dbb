use std::cell::OnceCell;
use std::rc::Rc;
use std::sync::{Arc, OnceLock};

use indoc::indoc;
use opjson::{
    DynDescribe, EncodeError, EncodeOptions, describe, to_string, to_string_pretty, to_vec,
    to_vec_dyn,
};
use opjson_testhelpers::test;

describe! {
    struct Point {
        x: i32,
        y: i32,
    }
}

describe! {
    struct Envelope {
        kind: &'static str,
        payload: Box<dyn DynDescribe>,
    }
}

#[test]
fn interface_values_use_their_dynamic_type() {
    let point = Envelope {
        kind: "point",
        payload: Box::new(Point { x: 1, y: 2 }),
    };
    assert_eq!(
        to_string(&point).unwrap(),
        r#"{"kind":"point","payload":{"x":1,"y":2}}"#
    );

    let list = Envelope {
        kind: "list",
        payload: Box::new(vec!["a", "b"]),
    };
    assert_eq!(
        to_string(&list).unwrap(),
        r#"{"kind":"list","payload":["a","b"]}"#
    );

    let nothing = Envelope {
        kind: "none",
        payload: Box::new(Option::<u8>::None),
    };
    assert_eq!(
        to_string(&nothing).unwrap(),
        r#"{"kind":"none","payload":null}"#
    );
}

#[test]
fn interface_values_indent_from_their_position() {
    let value = Envelope {
        kind: "point",
        payload: Box::new(Point { x: 1, y: 2 }),
    };
    assert_eq!(
        to_string_pretty(&value).unwrap(),
        indoc! {r#"
            {
              "kind": "point",
              "payload": {
                "x": 1,
                "y": 2
              }
            }"#}
    );
}

#[test]
fn missing_interface_values_are_null() {
    let three: Box<dyn DynDescribe> = Box::new(3u8);
    let text: Box<dyn DynDescribe> = Box::new("s");
    let values = vec![None, Some(three), Some(text)];
    assert_eq!(to_string(&values).unwrap(), r#"[null,3,"s"]"#);
}

#[test]
fn shared_interface_values() {
    let shared: Arc<dyn DynDescribe + Send + Sync> = Arc::new(Point { x: 0, y: 0 });
    let values = vec![Arc::clone(&shared), shared];
    assert_eq!(to_string(&values).unwrap(), r#"[{"x":0,"y":0},{"x":0,"y":0}]"#);
}

#[test]
fn encode_through_a_trait_object() {
    let value: &dyn DynDescribe = &Point { x: 5, y: -5 };
    assert_eq!(
        to_vec_dyn(value, &EncodeOptions::default()).unwrap(),
        br#"{"x":5,"y":-5}"#
    );
}

describe! {
    struct Tree {
        label: u32,
        kids: Vec<Tree>,
    }
}

#[test]
fn recursive_types() {
    let tree = Tree {
        label: 1,
        kids: vec![
            Tree {
                label: 2,
                kids: vec![],
            },
            Tree {
                label: 3,
                kids: vec![Tree {
                    label: 4,
                    kids: vec![],
                }],
            },
        ],
    };
    assert_eq!(
        to_string(&tree).unwrap(),
        r#"{"label":1,"kids":[{"label":2,"kids":[]},{"label":3,"kids":[{"label":4,"kids":[]}]}]}"#
    );
}

#[test]
fn recursive_types_indent() {
    let tree = Tree {
        label: 1,
        kids: vec![Tree {
            label: 2,
            kids: vec![],
        }],
    };
    assert_eq!(
        to_string_pretty(&tree).unwrap(),
        indoc! {r#"
            {
              "label": 1,
              "kids": [
                {
                  "label": 2,
                  "kids": []
                }
              ]
            }"#}
    );
}

describe! {
    struct List {
        value: u32,
        next: Option<Box<List>>,
    }
}

#[test]
fn deep_acyclic_values_encode() {
    let mut list = List {
        value: 1499,
        next: None,
    };
    for value in (0..1499).rev() {
        list = List {
            value,
            next: Some(Box::new(list)),
        };
    }
    let json = to_string(&list).unwrap();
    assert!(json.starts_with(r#"{"value":0,"next":{"value":1,"next":{"#));
    assert!(json.ends_with(&format!(r#"{{"value":1499,"next":null{}"#, "}".repeat(1500))));
}

describe! {
    struct Shared {
        label: u32,
        kids: Vec<Arc<Shared>>,
    }
}

#[test]
fn repeated_values_deep_down_are_not_cycles() {
    let leaf = Arc::new(Shared {
        label: 0,
        kids: vec![],
    });
    let mut node = Arc::new(Shared {
        label: 1,
        kids: vec![Arc::clone(&leaf), leaf],
    });
    for label in 2..=1100 {
        node = Arc::new(Shared {
            label,
            kids: vec![node],
        });
    }
    let json = to_string(&*node).unwrap();
    assert!(json.contains(
        r#"{"label":1,"kids":[{"label":0,"kids":[]},{"label":0,"kids":[]}]}"#
    ));
}

describe! {
    struct Node {
        name: String,
        next: OnceCell<Rc<Node>>,
    }
}

#[test]
fn self_referencing_values_are_rejected() {
    let node = Rc::new(Node {
        name: "loop".into(),
        next: OnceCell::new(),
    });
    assert!(node.next.set(Rc::clone(&node)).is_ok());

    let err = to_vec(&*node).unwrap_err();
    assert!(matches!(err, EncodeError::UnsupportedValue { .. }), "{err:?}");
    assert_eq!(err.code(), "json::unsupported_value");
    assert!(err.to_string().contains("cycle"), "{err}");
}

#[test]
fn longer_cycles_are_rejected() {
    let a = Rc::new(Node {
        name: "a".into(),
        next: OnceCell::new(),
    });
    let b = Rc::new(Node {
        name: "b".into(),
        next: OnceCell::new(),
    });
    let c = Rc::new(Node {
        name: "c".into(),
        next: OnceCell::new(),
    });
    assert!(a.next.set(Rc::clone(&b)).is_ok());
    assert!(b.next.set(Rc::clone(&c)).is_ok());
    assert!(c.next.set(Rc::clone(&a)).is_ok());

    for node in [&a, &b, &c] {
        assert!(matches!(
            to_vec(&**node).unwrap_err(),
            EncodeError::UnsupportedValue { .. }
        ));
    }
}

#[test]
fn terminated_chains_are_not_cycles() {
    let tail = Rc::new(Node {
        name: "tail".into(),
        next: OnceCell::new(),
    });
    let head = Node {
        name: "head".into(),
        next: OnceCell::from(tail),
    };
    assert_eq!(
        to_string(&head).unwrap(),
        r#"{"name":"head","next":{"name":"tail","next":null}}"#
    );
}

describe! {
    struct Holder {
        inner: OnceLock<Arc<dyn DynDescribe + Send + Sync>>,
    }
}

#[test]
fn cycles_through_interfaces_are_rejected() {
    let holder = Arc::new(Holder {
        inner: OnceLock::new(),
    });
    let erased: Arc<dyn DynDescribe + Send + Sync> = holder.clone();
    assert!(holder.inner.set(erased).is_ok());

    let err = to_vec(&*holder).unwrap_err();
    assert!(matches!(err, EncodeError::UnsupportedValue { .. }), "{err:?}");
}
