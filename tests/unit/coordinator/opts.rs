use super::*;

#[test]
fn defaults_render_synchronously_and_show_subtitles() {
    let opts = SubOpts::default();
    assert_eq!(opts.render_ahead, 0);
    assert!(opts.visibility);
    assert_eq!(opts.cache_capacity(), CACHE_SLACK);
}

#[test]
fn json_fills_missing_fields() {
    let opts = SubOpts::from_json_str(r#"{ "render_ahead": 12 }"#).unwrap();
    assert_eq!(opts.render_ahead, 12);
    assert!(opts.visibility);
    assert_eq!(opts.cache_capacity(), 22);
}

#[test]
fn json_rejects_unknown_fields() {
    let err = SubOpts::from_json_str(r#"{ "render_behind": 1 }"#).unwrap_err();
    assert!(err.to_string().starts_with("validation error:"));
}

#[test]
fn render_ahead_is_bounded() {
    let opts = SubOpts {
        render_ahead: MAX_RENDER_AHEAD + 1,
        ..SubOpts::default()
    };
    assert!(opts.validate().is_err());
    assert!(SubOpts::from_json_str(r#"{ "render_ahead": 501 }"#).is_err());
    assert!(SubOpts::from_json_str(r#"{ "render_ahead": 500 }"#).is_ok());
}
