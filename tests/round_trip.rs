use emx_ldif::{
    Attribute, ChangeRecord, Control, Decoder, Encoder, EncodingStrategy, Modification, ModificationType,
};

fn control_sets() -> Vec<Vec<Control>> {
    vec![
        vec![],
        vec![Control::new("1.2.840.113556.1.4.805", true, None)],
        vec![
            Control::new("1.1.1.1", false, None),
            Control::new("1.1.1.2", true, Some(b"inline value".to_vec())),
            Control::new("1.1.1.3", false, Some(Vec::new())),
            Control::new("1.1.1.4", true, Some(vec![0x30, 0x03, 0x02, 0x01, 0x00])),
            Control::new("1.1.1.5", false, Some(b" needs encoding ".to_vec())),
        ],
    ]
}

fn records() -> Vec<ChangeRecord> {
    let mut out = Vec::new();
    for controls in control_sets() {
        out.push(
            ChangeRecord::add(
                "cn=Jalapeño Pepper,ou=People,o=example.com",
                vec![
                    Attribute::new("objectClass", vec![b"top".to_vec(), b"person".to_vec()]),
                    Attribute::new("cn", vec!["Jalapeño Pepper".as_bytes().to_vec()]),
                    Attribute::new("userCertificate;binary", vec![vec![0x30, 0x82, 0x00, 0xFF]]),
                    Attribute::new("description", vec![b"x".repeat(200), b"line one\nline two".to_vec()]),
                    Attribute::new("emptyValue", vec![Vec::new()]),
                ],
            )
            .with_controls(controls.clone()),
        );
        out.push(ChangeRecord::delete("cn=gone,o=example.com").with_controls(controls.clone()));
        out.push(
            ChangeRecord::modify(
                "cn=jdoe,o=example.com",
                vec![
                    Modification::new(ModificationType::Add, "mail", vec![b"a@example.com".to_vec(), b"b@example.com".to_vec()]),
                    Modification::new(ModificationType::Delete, "description", vec![]),
                    Modification::new(ModificationType::Delete, "seeAlso", vec![b":colon first".to_vec()]),
                    Modification::new(ModificationType::Replace, "telephoneNumber", vec![]),
                    Modification::new(ModificationType::Increment, "uidNumber", vec![b"1".to_vec()]),
                ],
            )
            .with_controls(controls.clone()),
        );
        out.push(ChangeRecord::rename("ou=People,o=example.com", "ou=Users", true, None).with_controls(controls.clone()));
        out.push(
            ChangeRecord::rename("cn=x,o=example.com", "cn=y", false, Some("ou=Moved,o=example.com".to_string()))
                .with_controls(controls),
        );
    }
    out
}

#[test]
fn every_kind_round_trips_under_every_strategy() {
    let decoder = Decoder::new();
    for strategy in [EncodingStrategy::DEFAULT, EncodingStrategy::MINIMAL, EncodingStrategy::MAXIMAL] {
        for wrap in [0, 76, 10] {
            let encoder = Encoder::new().with_strategy(strategy).with_wrap_column(wrap);
            for record in records() {
                let ldif = encoder.encode_change_record(&record);
                let decoded = decoder.decode_change_record(&ldif).unwrap_or_else(|e| {
                    panic!("{} for\n{}", e, String::from_utf8_lossy(&ldif))
                });
                assert_eq!(decoded, record);
            }
        }
    }
}

#[test]
fn streams_of_records_round_trip() {
    let records = records();
    let ldif = Encoder::new().with_version_header(true).encode_change_records(&records);
    let decoded = Decoder::new().decode_change_records(&ldif).unwrap();
    assert_eq!(decoded, records);
}

#[test]
fn controls_keep_their_order() {
    let ldif = "dn: cn=x\n\
                control: 3.3.3\n\
                control: 1.1.1 true\n\
                control: 2.2.2: two\n\
                changetype: delete\n";
    let record = Decoder::new().decode_change_record(ldif.as_bytes()).unwrap();
    let oids: Vec<&str> = record.controls().iter().map(|c| c.oid()).collect();
    assert_eq!(oids, vec!["3.3.3", "1.1.1", "2.2.2"]);

    let reordered = ChangeRecord::delete("cn=x").with_controls(record.controls().iter().rev().cloned());
    assert_ne!(reordered, record);
}
