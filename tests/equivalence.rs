//! Compiled programs must render exactly like the interpreter: same
//! output, or the same error at the same position.

use proptest::prelude::*;

use tapestry::codegen::{Expr, attach};
use tapestry::{
    CompileOptions, Context, Engine, Registry, RenderErrorKind, RenderOptions, SourcePos,
    TemplateError, Value, compile, interp, parse,
};

const TEMPLATES: &[(&str, &str)] = &[
    ("empty.html", ""),
    ("simple.html", "Hello, world!\n"),
    ("var.html", "<p>{{ var }}</p>\n"),
    ("var_default.html", "<p>{{ var|default:\"N/A\" }}</p>\n"),
    ("var_default_html.html", "<p>{{ var|default:\"<b>none</b>\" }}</p>\n"),
    ("var_default_var.html", "<p>{{ var|default:other }}</p>\n"),
    ("var_filters.html", "<p>{{ var|default:\"x\"|upper|capfirst }}|{{ var|length }}</p>\n"),
    ("block_upper.html", "{% filter upper %}\nSome uppercased text\n{% endfilter %}"),
    (
        "loop.html",
        "{% for item in var %}{{ forloop.counter }}:{{ item|default:\"-\" }} {% empty %}nothing{% endfor %}",
    ),
    (
        "branches.html",
        "{% if not var %}falsy{% elif other %}{{ other }}{% else %}{{ var }}{% endif %}",
    ),
];

fn engine() -> Engine {
    let engine = Engine::default();
    for (name, source) in TEMPLATES {
        engine.add_template(*name, *source);
    }
    engine
}

fn ctx(entries: &[(&str, Value)]) -> Context {
    entries.iter().cloned().collect()
}

type Outcome = Result<String, (RenderErrorKind, Option<SourcePos>, String)>;

fn outcome(result: Result<String, TemplateError>) -> Outcome {
    result.map_err(|e| match e {
        TemplateError::Render(e) => (e.kind, e.pos, e.message),
        other => panic!("expected a render result, got {other}"),
    })
}

/// Render `name` both ways and check they agree. Returns the shared outcome.
fn assert_rendered_equally(name: &str, entries: &[(&str, Value)]) -> Outcome {
    let engine = engine();
    let native = outcome(engine.render_native(name, &mut ctx(entries), RenderOptions::default()));
    let compiled = outcome(engine.render(name, &mut ctx(entries)));
    assert_eq!(native, compiled, "{name} with {entries:?}");
    native
}

#[test]
fn test_no_context() {
    for name in [
        "empty.html",
        "simple.html",
        "var.html",
        "var_default.html",
        "var_default_var.html",
        "var_filters.html",
        "loop.html",
        "branches.html",
    ] {
        assert_rendered_equally(name, &[]);
    }
}

#[test]
fn test_var_filter_lookup() {
    let cases: Vec<(&str, Vec<(&str, Value)>)> = vec![
        ("var.html", vec![("var", "".into())]),
        ("var.html", vec![("var", "test".into())]),
        ("var_default.html", vec![("var", "".into())]),
        ("var_default.html", vec![("var", "test".into())]),
        ("var_default_var.html", vec![("var", "".into())]),
        ("var_default_var.html", vec![("var", "".into()), ("other", "".into())]),
        ("var_default_var.html", vec![("var", "".into()), ("other", "other".into())]),
        ("var_default_var.html", vec![("var", "test".into())]),
        ("var_default_var.html", vec![("var", "test".into()), ("other", "".into())]),
        ("var_default_var.html", vec![("var", "test".into()), ("other", "other".into())]),
        ("var_filters.html", vec![("var", "".into())]),
        ("var_filters.html", vec![("var", "test".into())]),
    ];
    for (name, entries) in &cases {
        assert_rendered_equally(name, entries);
    }
}

#[test]
fn test_var_escaping() {
    for name in ["var.html", "var_default_html.html", "var_default_var.html", "var_filters.html"] {
        assert_rendered_equally(name, &[("var", "<html>".into())]);
    }
    assert_eq!(
        assert_rendered_equally("var.html", &[("var", "<html>".into())]),
        Ok("<p>&lt;html&gt;</p>\n".to_string())
    );
    // String literals are escaped like any other value; there is no safe
    // marking for template literals.
    assert_eq!(
        assert_rendered_equally("var_default_html.html", &[]),
        Ok("<p>&lt;b&gt;none&lt;/b&gt;</p>\n".to_string())
    );
}

#[test]
fn test_other_types() {
    assert_rendered_equally("var.html", &[("var", vec![1i64, 2, 3].into())]);
    assert_rendered_equally("var_default.html", &[("var", Value::Array(Vec::new()))]);
    assert_rendered_equally("var_filters.html", &[("var", vec![1i64, 2, 3].into())]);
    assert_rendered_equally("loop.html", &[("var", vec!["a", ""].into())]);
    assert_rendered_equally("loop.html", &[("var", 5i64.into())]);
    assert_rendered_equally("branches.html", &[("var", 0i64.into()), ("other", "o".into())]);
    assert_rendered_equally("branches.html", &[("var", true.into()), ("other", "o".into())]);
}

#[test]
fn test_missing_filter_argument_fails_the_same_way() {
    let result = assert_rendered_equally("var_default_var.html", &[("var", "test".into())]);
    let (kind, pos, message) = result.unwrap_err();
    assert_eq!(kind, RenderErrorKind::MissingVariable);
    assert_eq!(pos, Some(SourcePos::new(1, 19)));
    assert_eq!(message, "variable does not exist: other");
}

#[test]
fn test_fallback() {
    let engine = engine();
    assert!(!engine.get_template("block_upper.html").unwrap().is_compiled());
    assert_eq!(
        assert_rendered_equally("block_upper.html", &[]),
        Ok("\nSOME UPPERCASED TEXT\n".to_string())
    );
}

#[test]
fn test_loop_output() {
    assert_eq!(
        assert_rendered_equally("loop.html", &[("var", vec!["a", ""].into())]),
        Ok("1:a 2:- ".to_string())
    );
    assert_eq!(assert_rendered_equally("loop.html", &[]), Ok("nothing".to_string()));
}

// ── Core scenarios ──────────────────────────────────────────────────────

fn both(source: &str, context: &Context) -> (Outcome, Outcome) {
    let registry = Registry::default();
    let template = parse(source).unwrap();
    let native = interp::render(&template, &mut context.clone(), &registry)
        .map_err(|e| (e.kind, e.pos, e.message));
    let compiled = compile(source, &registry)
        .unwrap()
        .render(&mut context.clone(), RenderOptions::default())
        .map_err(|e| (e.kind, e.pos, e.message));
    (native, compiled)
}

#[test]
fn test_literal_only_template() {
    let (native, compiled) = both("Just text, no tags.", &Context::new());
    assert_eq!(native, compiled);
    assert_eq!(compiled, Ok("Just text, no tags.".to_string()));
}

#[test]
fn test_missing_variable_lenient_is_empty() {
    let (native, compiled) = both("{{ user.name }}", &Context::new());
    assert_eq!(native, compiled);
    assert_eq!(compiled, Ok(String::new()));
}

#[test]
fn test_missing_variable_lenient_with_fallback() {
    let (native, compiled) = both("{{ user.name|default:\"N/A\" }}", &Context::new());
    assert_eq!(native, compiled);
    assert_eq!(compiled, Ok("N/A".to_string()));
}

#[test]
fn test_missing_variable_strict_fails() {
    let (native, compiled) = both("{{ 'x'|default:user.name }}", &Context::new());
    assert_eq!(native, compiled);
    let (kind, pos, _) = compiled.unwrap_err();
    assert_eq!(kind, RenderErrorKind::MissingVariable);
    assert_eq!(pos, Some(SourcePos::new(1, 16)));
}

#[test]
fn test_repeated_path_interns_one_descriptor() {
    let source = "{{ user.name }} / {{ user.name|upper }}";
    let program = compile(source, &Registry::default()).unwrap();
    assert_eq!(program.descriptor_count(), 1);
    assert_eq!(program.descriptors()[0].path().key(), "user.name");

    let user: Value = [("name", "ada")].into_iter().collect();
    let context = ctx(&[("user", user)]);
    let (native, compiled) = both(source, &context);
    assert_eq!(native, compiled);
    assert_eq!(compiled, Ok("ada / ADA".to_string()));
}

#[test]
fn test_falsy_default_literal() {
    for source in ["{{ x|default:\"\" }}", "{{ x|default:0 }}", "{{ x|default:false }}"] {
        let (native, compiled) = both(source, &Context::new());
        assert_eq!(native, compiled, "{source}");
    }
}

#[test]
fn test_default_as_fallback_disabled_agrees() {
    let engine = Engine::with_options(
        Registry::default(),
        CompileOptions::new().default_as_fallback(false),
    );
    engine.add_template("t", "{{ x|default:\"N/A\" }}");
    assert_eq!(engine.render("t", &mut Context::new()).unwrap(), "N/A");
}

// ── Properties ──────────────────────────────────────────────────────────

fn piece() -> impl Strategy<Value = String> {
    let var = prop::sample::select(vec!["a", "b", "c", "a.k", "b.0"]);
    let simple_var = prop::sample::select(vec!["a", "b", "c"]);
    prop_oneof![
        prop::sample::select(vec!["text ", "<b>", "\n"]).prop_map(str::to_string),
        var.clone().prop_map(|v| format!("{{{{ {v} }}}}")),
        var.clone().prop_map(|v| format!("{{{{ {v}|default:\"d\" }}}}")),
        var.clone().prop_map(|v| format!("{{{{ {v}|default:\"\"|upper }}}}")),
        (var.clone(), simple_var.clone())
            .prop_map(|(v, w)| format!("{{{{ {v}|default:{w} }}}}")),
        (var.clone(), simple_var.clone())
            .prop_map(|(v, w)| format!("{{% if not {v} %}}[{{{{ {w} }}}}]{{% else %}}{{{{ {v}|length }}}}{{% endif %}}")),
        simple_var.prop_map(|v| format!(
            "{{% for i in {v} %}}{{{{ i|default:\"-\" }}}}{{% if not forloop.last %}},{{% endif %}}{{% empty %}}0{{% endfor %}}"
        )),
    ]
}

fn value() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        Just(Some(Value::from(""))),
        Just(Some(Value::from("x<y"))),
        Just(Some(Value::from(0i64))),
        Just(Some(Value::from(7i64))),
        Just(Some(Value::Bool(false))),
        Just(Some(Value::from(vec!["p", ""]))),
        Just(Some([("k", "v")].into_iter().collect::<Value>())),
    ]
}

proptest! {
    #[test]
    fn prop_compiled_matches_interpreted(
        pieces in prop::collection::vec(piece(), 0..6),
        a in value(),
        b in value(),
        c in value(),
    ) {
        let source = pieces.concat();
        let mut context = Context::new();
        for (name, v) in [("a", a), ("b", b), ("c", c)] {
            if let Some(v) = v {
                context.set(name, v);
            }
        }
        let (native, compiled) = both(&source, &context);
        prop_assert_eq!(native, compiled, "{}", source);
    }

    #[test]
    fn prop_one_descriptor_per_path(order in Just(vec!["a.b", "a", "a.b", "c", "a"]).prop_shuffle()) {
        let source: String = order.iter().map(|p| format!("{{{{ {p} }}}}")).collect();
        let program = compile(&source, &Registry::default()).unwrap();
        prop_assert_eq!(program.descriptor_count(), 3);
    }

    #[test]
    fn prop_attach_is_idempotent(line in 0u32..500, column in 0u32..200) {
        let pos = SourcePos::new(line, column);
        let once = attach(Expr::literal(Value::from("v")), &pos);
        let twice = attach(attach(Expr::literal(Value::from("v")), &pos), &pos);
        prop_assert_eq!(once.pos(), pos);
        prop_assert_eq!(once, twice);
    }
}
