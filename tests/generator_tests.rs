use hlms::{PropertyStore, TemplateParser};

// Run with RUST_LOG=debug to see the parser's diagnostics.
fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn store(entries: &[(&str, i32)]) -> PropertyStore {
    PropertyStore::from(entries)
}

#[test]
fn vertex_attributes_follow_uv_count() {
    let mut props = store(&[("hlms_uv_count", 2)]);
    let parser = TemplateParser::new(&mut props);
    let out = parser.render(
        "@foreach(uv, 0, hlms_uv_count)in vec2 uv@uv;\n@end\n",
        &[] as &[&str],
    );
    assert_eq!(out.source, "in vec2 uv0;\nin vec2 uv1;\n");
    assert!(out.is_clean());
}

#[test]
fn skinning_piece_spliced_behind_guard() {
    let piece = "@piece(SkinVS)// skinning\npos = blend(pos);\n@end\n";
    let template = "void main() {\n@property(hlms_skeleton)@insertpiece(SkinVS)@end\n}\n";

    let mut props = store(&[("hlms_skeleton", 1)]);
    let out = TemplateParser::new(&mut props).render(template, &[piece]);
    assert_eq!(
        out.source,
        "void main() {\n// skinning\npos = blend(pos);\n\n}\n"
    );
    assert!(out.is_clean());

    let mut props = store(&[("hlms_skeleton", 0)]);
    let out = TemplateParser::new(&mut props).render(template, &[piece]);
    assert_eq!(out.source, "void main() {\n\n}\n");
    assert!(out.is_clean());
}

#[test]
fn counters_allocate_sequential_registers() {
    let mut props = store(&[]);
    let out = TemplateParser::new(&mut props).render(
        "sampler tex@counter(reg);\nsampler tex@counter(reg);\n",
        &[] as &[&str],
    );
    assert_eq!(out.source, "sampler tex0;\nsampler tex1;\n");
}

#[test]
fn math_feeds_guards_and_late_values() {
    let mut props = store(&[]);
    let out = TemplateParser::new(&mut props).render(
        "@pset(lights, 2)@property(lights)lights=@value(lights)@end\n",
        &[] as &[&str],
    );
    assert_eq!(out.source, "lights=2\n");
    assert!(out.is_clean());
}

#[test]
fn guard_expressions_combine_properties() {
    let template = "@property(hlms_normal && !hlms_shadowcaster)lit();\n@end\n";

    let mut props = store(&[("hlms_normal", 1)]);
    let out = TemplateParser::new(&mut props).render(template, &[] as &[&str]);
    assert_eq!(out.source, "lit();\n\n");

    let mut props = store(&[("hlms_normal", 1), ("hlms_shadowcaster", 1)]);
    let out = TemplateParser::new(&mut props).render(template, &[] as &[&str]);
    assert_eq!(out.source, "\n");
}

#[test]
fn malformed_directive_degrades_but_render_continues() {
    init_logs();
    let mut props = store(&[("ok", 1)]);
    let out = TemplateParser::new(&mut props).render(
        "@property(ok)kept\n@end@pdiv(broken\nrest\n",
        &[] as &[&str],
    );
    assert!(out.source.starts_with("kept\n"));
    assert!(!out.is_clean());
}

#[test]
fn self_inserting_piece_degrades_instead_of_hanging() {
    init_logs();
    let mut props = store(&[]);
    let out = TemplateParser::new(&mut props).render(
        "@piece(a)x@insertpiece(a)@end @insertpiece(a)\n",
        &[] as &[&str],
    );
    assert!(!out.is_clean());
    assert!(out
        .errors
        .iter()
        .any(|e| e.message.contains("expansion limit")));
}

#[test]
fn piece_files_contribute_definitions_and_side_effects() {
    let pieces = [
        "@pset(has_fog, 1)\n".to_string(),
        "@piece(FogPS)applyFog();\n@end\n".to_string(),
    ];
    let mut props = store(&[]);
    let out = TemplateParser::new(&mut props).render(
        "@property(has_fog)@insertpiece(FogPS)@end\n",
        &pieces,
    );
    assert_eq!(out.source, "applyFog();\n\n");
    assert!(out.is_clean());
}
