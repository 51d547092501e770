//! The properties switch is process-wide, so it is exercised in its own test binary.

use flatlay::{CodecRegistry, Config, Flat, MemberOrigin};

#[derive(Debug, Default, Clone, PartialEq, Flat)]
#[flat(property(name = "total", ty = i64, get = total, set = set_total))]
#[flat(property(name = "summary", ty = String, get = summary))]
pub struct Invoice {
    pub id: u32,
    cents: i64,
}

impl Invoice {
    pub fn total(&self) -> i64 {
        self.cents
    }

    pub fn set_total(&mut self, total: i64) {
        self.cents = total;
    }

    pub fn summary(&self) -> String {
        format!("invoice {}", self.id)
    }
}

#[test]
fn test_properties_switch() {
    let invoice = Invoice { id: 4, cents: 1999 };

    // A registry with an explicit setting ignores the switch.
    let fields_only = CodecRegistry::new(Config::default().with_serialize_properties(false));

    assert!(!flatlay::serialize_properties());
    flatlay::set_serialize_properties(true);
    assert!(flatlay::serialize_properties());

    let bytes = flatlay::encode(&invoice).unwrap();
    let mut expected = 4u32.to_ne_bytes().to_vec();
    expected.extend_from_slice(&1999i64.to_ne_bytes());
    assert_eq!(bytes, expected);
    assert_eq!(flatlay::decode::<Invoice>(&bytes).unwrap(), invoice);

    let plan = flatlay::layout_of::<Invoice>().unwrap();
    let origins: Vec<_> = plan.members().map(|m| (m.name, m.origin)).collect();
    assert_eq!(
        origins,
        [
            ("id", MemberOrigin::Field),
            (
                "total",
                MemberOrigin::Property {
                    getter: Some("total"),
                    setter: Some("set_total")
                }
            ),
        ]
    );

    let bytes = fields_only.encode(&invoice).unwrap();
    assert_eq!(bytes, 4u32.to_ne_bytes());
    assert_eq!(
        fields_only.decode::<Invoice>(&bytes).unwrap(),
        Invoice { id: 4, cents: 0 }
    );

    // Codecs already built keep their layout.
    flatlay::set_serialize_properties(false);
    assert_eq!(flatlay::encode(&invoice).unwrap().len(), 12);
}
