use chrono::{TimeZone, Utc};
use techinsight_core::{Paper, PaperValidationError, RawPaper};

fn raw_paper() -> RawPaper {
    RawPaper {
        id: Some("2403.01234v2".to_string()),
        title: Some("Forecasting River Floods with Graph Networks".to_string()),
        authors: vec![
            "Grace Hopper".to_string(),
            "Alan Turing".to_string(),
            "Grace Hopper".to_string(),
        ],
        abstract_text: Some("We study flood forecasting.".to_string()),
        categories: vec!["cs.LG".to_string(), "physics.ao-ph".to_string(), "cs.LG".to_string()],
        published_date: Some("2024-03-02T17:45:12Z".to_string()),
        pdf_link: Some("http://arxiv.org/pdf/2403.01234v2".to_string()),
    }
}

#[test]
fn raw_to_paper_to_raw_preserves_every_field() {
    let raw = raw_paper();
    let paper = Paper::from_raw(raw.clone()).unwrap();

    assert_eq!(paper.to_raw(), raw);
    assert_eq!(paper.authors().len(), 3);
    assert_eq!(paper.categories()[2], "cs.LG");
    assert_eq!(
        paper.published_date(),
        Utc.with_ymd_and_hms(2024, 3, 2, 17, 45, 12).unwrap()
    );
}

#[test]
fn from_raw_normalizes_url_identifiers() {
    let mut raw = raw_paper();
    raw.id = Some("http://arxiv.org/abs/2403.01234v2".to_string());

    let paper = Paper::from_raw(raw).unwrap();
    assert_eq!(paper.id(), "2403.01234v2");
}

#[test]
fn from_raw_converts_offsets_to_utc() {
    let mut raw = raw_paper();
    raw.published_date = Some("2024-03-02T19:45:12+02:00".to_string());

    let paper = Paper::from_raw(raw).unwrap();
    assert_eq!(
        paper.published_date(),
        Utc.with_ymd_and_hms(2024, 3, 2, 17, 45, 12).unwrap()
    );
}

#[test]
fn from_raw_reports_first_missing_required_field() {
    let mut raw = raw_paper();
    raw.title = None;
    raw.pdf_link = None;
    assert_eq!(
        Paper::from_raw(raw).unwrap_err(),
        PaperValidationError::MissingField("title")
    );

    let mut raw = raw_paper();
    raw.abstract_text = None;
    assert_eq!(
        Paper::from_raw(raw).unwrap_err(),
        PaperValidationError::MissingField("abstract")
    );
}

#[test]
fn from_raw_rejects_blank_id_and_bad_timestamp() {
    let mut raw = raw_paper();
    raw.id = Some("   ".to_string());
    assert_eq!(Paper::from_raw(raw).unwrap_err(), PaperValidationError::EmptyId);

    let mut raw = raw_paper();
    raw.published_date = Some("last tuesday".to_string());
    assert!(matches!(
        Paper::from_raw(raw).unwrap_err(),
        PaperValidationError::InvalidPublishedDate(_)
    ));
}

#[test]
fn json_wire_shape_uses_abstract_key() {
    let paper = Paper::from_raw(raw_paper()).unwrap();
    let value = serde_json::to_value(&paper).unwrap();

    assert_eq!(value["id"], "2403.01234v2");
    assert_eq!(value["abstract"], "We study flood forecasting.");
    assert!(value.get("abstract_text").is_none());
    assert_eq!(value["authors"][1], "Alan Turing");
    assert_eq!(value["published_date"], "2024-03-02T17:45:12Z");
}

#[test]
fn deserialization_goes_through_validation() {
    let paper = Paper::from_raw(raw_paper()).unwrap();
    let json = serde_json::to_string(&paper).unwrap();
    let decoded: Paper = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, paper);

    let invalid = r#"{"id": "x", "title": "t", "abstract": "a", "published_date": "never", "pdf_link": "p"}"#;
    assert!(serde_json::from_str::<Paper>(invalid).is_err());
}
