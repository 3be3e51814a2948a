use form_spec::{FileAttachment, FileViolation, QuestionSpec, QuestionType, validate_files};

fn file_question(accept: Option<&str>, max_size: Option<f64>, multiple: bool) -> QuestionSpec {
    let mut question = QuestionSpec::new("adjunto", QuestionType::File, "Adjunto");
    question.accept = accept.map(str::to_string);
    question.max_size = max_size;
    question.multiple = multiple;
    question
}

fn sized(name: &str, mime: &str, size: u64) -> FileAttachment {
    FileAttachment {
        name: name.into(),
        mime_type: mime.into(),
        size,
        data: Vec::new(),
    }
}

#[test]
fn empty_batch_has_no_violations() {
    let question = file_question(None, None, false);
    assert!(validate_files(&[], &question).is_empty());
}

#[test]
fn accept_matches_extension_or_mime() {
    let question = file_question(Some(".pdf,image/*"), Some(5.0), true);

    let by_extension = sized("a.pdf", "application/octet-stream", 10);
    assert!(validate_files(&[by_extension], &question).is_empty());

    let by_mime_prefix = sized("scan", "image/png", 10);
    assert!(validate_files(&[by_mime_prefix], &question).is_empty());

    let rejected = sized("a.txt", "text/plain", 10);
    let violations = validate_files(&[rejected], &question);
    assert_eq!(
        violations,
        vec![FileViolation::TypeNotAllowed {
            file: "a.txt".into(),
            allowed: ".pdf, imágenes".into(),
        }]
    );
}

#[test]
fn extension_match_is_case_insensitive() {
    let question = file_question(Some(".PDF"), None, false);
    assert!(validate_files(&[sized("INFORME.Pdf", "", 1)], &question).is_empty());
}

#[test]
fn exact_mime_pattern_requires_equality() {
    let question = file_question(Some("application/pdf"), None, false);
    assert!(validate_files(&[sized("x", "application/pdf", 1)], &question).is_empty());
    assert_eq!(
        validate_files(&[sized("x.pdf", "application/pdfx", 1)], &question).len(),
        1
    );
}

#[test]
fn default_rules_accept_small_pdfs_only() {
    let question = file_question(None, None, false);
    assert!(validate_files(&[sized("a.pdf", "application/pdf", 1024)], &question).is_empty());
    assert_eq!(
        validate_files(&[sized("a.docx", "application/msword", 1024)], &question).len(),
        1
    );
}

#[test]
fn size_boundary_is_inclusive() {
    let question = file_question(Some(".pdf"), Some(1.0), false);
    let limit = 1024 * 1024;

    assert!(validate_files(&[sized("a.pdf", "application/pdf", limit)], &question).is_empty());

    let violations = validate_files(&[sized("a.pdf", "application/pdf", limit + 1)], &question);
    assert_eq!(violations.len(), 1);
    assert!(matches!(violations[0], FileViolation::TooLarge { .. }));
}

#[test]
fn default_max_size_is_half_megabyte() {
    let question = file_question(Some(".pdf"), None, false);
    let half = 512 * 1024;
    assert!(validate_files(&[sized("a.pdf", "", half)], &question).is_empty());
    assert_eq!(validate_files(&[sized("a.pdf", "", half + 1)], &question).len(), 1);
}

#[test]
fn size_message_reports_two_decimals() {
    let question = file_question(Some(".pdf"), Some(1.0), false);
    let violations = validate_files(&[sized("big.pdf", "", 3 * 1024 * 1024 / 2)], &question);
    assert_eq!(
        violations[0].to_string(),
        "El archivo \"big.pdf\" pesa 1.50 MB y supera el máximo de 1 MB"
    );
}

#[test]
fn single_file_question_short_circuits_on_multiplicity() {
    let question = file_question(Some(".pdf"), Some(0.000001), false);
    let violations = validate_files(
        &[sized("a.exe", "", 100), sized("b.exe", "", 100)],
        &question,
    );
    assert_eq!(violations, vec![FileViolation::TooManyForSingle]);
    assert_eq!(violations[0].to_string(), "Solo se permite un archivo");
}

#[test]
fn violations_accumulate_across_files() {
    let question = file_question(Some(".pdf"), Some(1.0), true);
    let violations = validate_files(
        &[
            sized("ok.pdf", "", 10),
            sized("huge.pdf", "", 5 * 1024 * 1024),
            sized("huge.exe", "", 5 * 1024 * 1024),
        ],
        &question,
    );
    assert_eq!(violations.len(), 3);
}
