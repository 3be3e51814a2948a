use form_spec::{
    AnswerAction, AnswerStore, AnswerValue, FileAttachment, Form,
    render::{RenderStatus, build_render_payload, render_json_ui, render_text},
};

fn fixture(name: &str) -> &'static str {
    match name {
        "simple_form" => include_str!("../tests/fixtures/simple_form.json"),
        "subform_form" => include_str!("../tests/fixtures/subform_form.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

#[test]
fn render_text_lists_active_questions() {
    let form: Form = serde_json::from_str(fixture("simple_form")).expect("deserialize");
    let store = AnswerStore::new();
    let payload = build_render_payload(&form, &store);

    assert_eq!(payload.status, RenderStatus::NeedInput);
    assert_eq!(payload.progress.total, 2);
    assert_eq!(payload.progress.answered, 0);

    let text = render_text(&payload);
    assert!(text.contains("Form: Solicitud de contacto (form-contacto)"));
    assert!(text.contains("Nombre [text] (q-nombre) *"));
    assert!(text.contains("Files: .pdf (max 1 MB, up to 1)"));
}

#[test]
fn render_json_ui_exposes_structure() {
    let form: Form = serde_json::from_str(fixture("simple_form")).expect("deserialize");
    let mut store = AnswerStore::new();
    store.apply(AnswerAction::SetAnswer {
        question_id: "q-nombre".into(),
        value: "Ana".into(),
    });
    let payload = build_render_payload(&form, &store);

    let ui = render_json_ui(&payload);
    assert_eq!(ui["form_id"], "form-contacto");
    assert_eq!(ui["status"], "complete");
    assert_eq!(ui["theme"]["primary"], "#0F4C81");
    assert_eq!(ui["progress"]["answered"], 1);
    let questions = ui["questions"].as_array().expect("questions array");
    assert_eq!(questions[0]["current_value"], "Ana");
    assert_eq!(questions[1]["file_rules"]["allowed_types"], ".pdf");
}

#[test]
fn render_follows_selected_subforms() {
    let form: Form = serde_json::from_str(fixture("subform_form")).expect("deserialize");
    let mut store = AnswerStore::new();

    let payload = build_render_payload(&form, &store);
    assert_eq!(payload.questions.len(), 3);

    store.apply(AnswerAction::SetAnswer {
        question_id: "tipo".into(),
        value: "Accidente".into(),
    });
    store.apply(AnswerAction::SetAnswer {
        question_id: "gravedad".into(),
        value: AnswerValue::Choices(vec!["Grave".into()]),
    });
    let payload = build_render_payload(&form, &store);
    let ids: Vec<_> = payload.questions.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["tipo", "lesionados", "gravedad", "hospital", "evidencia", "correo"]
    );
    let hospital = &payload.questions[3];
    assert_eq!(hospital.depth, 2);
    assert_eq!(hospital.context_path.as_deref(), Some("Accidente|Grave"));

    let ui = render_json_ui(&payload);
    assert_eq!(ui["questions"][0]["options"][1], "Otro");
}

#[test]
fn errors_are_shown_only_after_touch() {
    let form: Form = serde_json::from_str(fixture("simple_form")).expect("deserialize");
    let mut store = AnswerStore::new();

    let payload = build_render_payload(&form, &store);
    assert!(payload.questions[0].error.is_none());

    store.validate_form(&form.questions);
    store.apply(AnswerAction::SetFiles {
        question: &form.questions[1],
        files: vec![FileAttachment::new("foto.png", "image/png", vec![0])],
    });
    let payload = build_render_payload(&form, &store);
    assert_eq!(
        payload.questions[0].error.as_deref(),
        Some("Este campo es obligatorio")
    );
    assert_eq!(payload.questions[1].file_errors.len(), 1);

    let text = render_text(&payload);
    assert!(text.contains("! Este campo es obligatorio"));
    assert!(text.contains("foto.png"));
}
