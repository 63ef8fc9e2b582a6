//! Example of encoding and decoding LDIF change records

use emx_ldif::{
    Attribute, ChangeRecord, Control, Decoder, Encoder, EncodingStrategy, Modification,
    ModificationType,
};

fn main() -> anyhow::Result<()> {
    println!("=== LDIF Change Record Example ===\n");

    let records = vec![
        ChangeRecord::add(
            "cn=jdoe,ou=People,o=example.com",
            vec![
                Attribute::new("objectClass", vec![b"top".to_vec(), b"person".to_vec()]),
                Attribute::new("cn", vec![b"jdoe".to_vec()]),
                Attribute::new("sn", vec!["jalapeño".as_bytes().to_vec()]),
                Attribute::new("jpegPhoto", vec![vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]]),
            ],
        ),
        ChangeRecord::modify(
            "cn=jdoe,ou=People,o=example.com",
            vec![Modification::new(
                ModificationType::Replace,
                "description",
                vec![b" starts with a space".to_vec()],
            )],
        )
        .with_control(Control::new("1.2.840.113556.1.4.805", true, None)),
        ChangeRecord::rename("ou=People,o=example.com", "ou=Users", true, None),
    ];

    for strategy in [EncodingStrategy::MINIMAL, EncodingStrategy::DEFAULT, EncodingStrategy::MAXIMAL] {
        let encoder = Encoder::new().with_strategy(strategy).with_version_header(true);
        let encoded = encoder.encode_change_records(&records);

        println!("Strategy: {:?}", strategy);
        println!("---");
        println!("{}", String::from_utf8_lossy(&encoded));
        println!("---\n");

        let decoded = Decoder::new().decode(&encoded)?;
        assert_eq!(decoded.len(), records.len());
        for (orig, dec) in records.iter().zip(decoded.iter()) {
            assert_eq!(Some(orig), dec.as_change());
        }
    }

    println!("Protocol requests:");
    for record in &records {
        let request = record.to_request();
        println!("  - {:?} ({} controls)", record.change_type(), request.controls.len());
        assert_eq!(&ChangeRecord::from_request(request), record);
    }

    println!("\nRound-trip verification passed!");

    Ok(())
}
