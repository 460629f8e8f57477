use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        SubError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(SubError::decode("x").to_string().contains("decode error:"));
    assert!(SubError::backend("x").to_string().contains("backend error:"));
}

#[test]
fn no_decoder_names_the_codec() {
    let err = SubError::no_decoder("hdmv_pgs");
    assert_eq!(
        err.to_string(),
        "no subtitle decoder for format 'hdmv_pgs'"
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = SubError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
