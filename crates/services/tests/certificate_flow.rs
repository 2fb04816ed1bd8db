use std::sync::Arc;
use std::time::Duration;

use lesson_core::model::{ActivityId, CertificateTier, StepId, StudentProfile};
use lesson_core::time::fixed_clock;
use services::LessonSession;
use services::certificate::{BackgroundPaint, CertificateLayout, DocumentRenderer};
use services::{
    CertificateConfig, CertificateError, FixedRunner, LessonPlan, LessonServices,
    ProgressionConfig, RunOutput, SvgRenderer,
};

fn services() -> LessonServices {
    LessonServices::in_memory(
        LessonPlan::python_intro(),
        fixed_clock(),
        Arc::new(FixedRunner::new(RunOutput::Silent)),
    )
}

#[tokio::test]
async fn certificate_requires_a_profile() {
    let services = services();
    assert!(matches!(
        services.certificates().generate().await,
        Err(CertificateError::MissingStudentName)
    ));
}

#[tokio::test]
async fn perfect_score_earns_the_golden_certificate() {
    let services = services();
    let mut session = services.start_session().await.unwrap();
    let profile = StudentProfile::new("Ada Lovelace", 36, "🐍", "advanced", "data").unwrap();
    session
        .submit_profile(ActivityId::new(101), &profile)
        .await
        .unwrap();

    let max = CertificateConfig::default().max_possible_score;
    services.store().set_score(max - 10).await.unwrap();
    let standard = services.certificates().generate().await.unwrap();
    assert_eq!(standard.tier, CertificateTier::Standard);
    let svg = String::from_utf8(standard.bytes).unwrap();
    assert!(svg.contains("Certificate of Completion"));
    assert!(!svg.contains("linearGradient"));

    services.store().set_score(max).await.unwrap();
    let golden = services.certificates().generate().await.unwrap();
    assert_eq!(golden.tier, CertificateTier::Golden);
    assert_eq!(golden.file_name, "Certificate-Python-Ada_Lovelace.svg");
    let svg = String::from_utf8(golden.bytes).unwrap();
    assert!(svg.contains("Certificate of Excellence (Gold)"));
    assert!(svg.contains("linearGradient"));
    assert!(svg.contains("Ada Lovelace"));

    let registry = services.store().certificate_registry().await.unwrap();
    assert_eq!(registry.entries().len(), 1);
    let entry = registry.find("Ada Lovelace").unwrap();
    assert_eq!(entry.player_score, max);
}

async fn unlock_through(session: &mut LessonSession, step: u32) {
    let step = StepId::new(step);
    session.show_step(step).unwrap();
    session.unlock(step).await.unwrap();
}

#[tokio::test]
async fn flawless_run_earns_the_golden_certificate() {
    let services = LessonServices::in_memory(
        LessonPlan::python_intro(),
        fixed_clock(),
        Arc::new(FixedRunner::new(RunOutput::Printed("1100.0\n".into()))),
    )
    .with_progression(ProgressionConfig {
        close_modal_delay: Duration::ZERO,
        ..ProgressionConfig::default()
    });
    let mut session = services.start_session().await.unwrap();
    let a = ActivityId::new;

    let profile = StudentProfile::new("Ada Lovelace", 36, "🐍", "advanced", "data").unwrap();
    session.submit_profile(a(101), &profile).await.unwrap();
    unlock_through(&mut session, 1).await;

    session.answer_quiz(a(201), 1).await.unwrap();
    unlock_through(&mut session, 2).await;

    session.run_sandbox(a(301), None, &[]).await.unwrap();
    session.answer_quiz(a(302), 1).await.unwrap();
    unlock_through(&mut session, 3).await;

    session.answer_quiz(a(401), 2).await.unwrap();
    unlock_through(&mut session, 4).await;
    unlock_through(&mut session, 5).await;

    for block in 6010..=6014 {
        session.place_block(a(601), block).unwrap();
    }
    assert!(session.check_drag_drop(a(601)).await.unwrap().0);
    unlock_through(&mut session, 6).await;

    session.run_sandbox(a(701), None, &[]).await.unwrap();
    for block in 7020..=7023 {
        session.place_block(a(702), block).unwrap();
    }
    assert!(session.check_drag_drop(a(702)).await.unwrap().0);
    unlock_through(&mut session, 7).await;

    for (concept, definition) in [(3, 0), (1, 1), (4, 2), (2, 3)] {
        session.drop_concept(a(801), concept, definition).await.unwrap();
    }
    unlock_through(&mut session, 8).await;

    session.save_notes(a(901), "lists are mutable").await.unwrap();
    unlock_through(&mut session, 9).await;

    while session.reveal_word(a(1001)).await.unwrap().is_some() {}
    unlock_through(&mut session, 10).await;

    for (quiz, option) in [(1101, 1), (1102, 0), (1103, 1)] {
        let answer = session.answer_quiz(a(quiz), option).await.unwrap();
        assert_eq!(answer.report.points_awarded, 10);
    }
    session
        .check_challenge(a(1104), "a = 15\nb = 30\nprint(a + b)")
        .await
        .unwrap();
    session
        .check_challenge(
            a(1105),
            "age = 20\nif age >= 18:\n    print(\"Adult\")\nelse:\n    print(\"Minor\")",
        )
        .await
        .unwrap();
    assert_eq!(
        session.assessment_score(StepId::new(11)).unwrap().to_string(),
        "50 of 50"
    );
    unlock_through(&mut session, 11).await;

    session
        .run_sandbox(a(1201), None, &["1000".to_owned()])
        .await
        .unwrap();
    unlock_through(&mut session, 12).await;
    unlock_through(&mut session, 13).await;
    unlock_through(&mut session, 14).await;

    session.rate(a(1501), 5).await.unwrap();
    unlock_through(&mut session, 15).await;

    let max = services.certificates().config().max_possible_score;
    assert_eq!(services.store().score().await.unwrap(), max);
    let document = services.certificates().generate().await.unwrap();
    assert_eq!(document.tier, CertificateTier::Golden);
}

#[tokio::test]
async fn gradient_is_banded_without_native_support() {
    let services = services();
    services
        .store()
        .set_student_profile(&StudentProfile::new("Grace", 40, "⚓", "advanced", "compilers").unwrap())
        .await
        .unwrap();
    services.store().set_score(160).await.unwrap();

    let renderer = SvgRenderer::without_gradients();
    assert!(!renderer.supports_native_gradients());
    let request = lesson_core::model::CertificateRequest {
        profile: services.store().student_profile().await.unwrap().unwrap(),
        score: 160,
        max_possible_score: 160,
        issued_at: fixed_clock().now(),
    };
    let layout = CertificateLayout::for_request(&request, &CertificateConfig::default());
    assert!(matches!(
        BackgroundPaint::choose(layout.background, renderer.supports_native_gradients()),
        BackgroundPaint::Bands(_)
    ));
    let svg = String::from_utf8(renderer.render(&layout).unwrap()).unwrap();
    assert!(!svg.contains("linearGradient"));
    assert!(svg.contains("#FFF8E1"));
}

#[tokio::test]
async fn certificate_is_written_to_disk() {
    let services = services();
    services
        .store()
        .set_student_profile(&StudentProfile::new("Linus T", 21, "🐧", "beginner", "systems").unwrap())
        .await
        .unwrap();

    let dir = std::env::temp_dir().join(format!("lesson-cert-{}", std::process::id()));
    let path = services.certificates().save_to(&dir).await.unwrap();
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("Certificate-Python-Linus_T.svg")
    );
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("<svg"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn slashes_in_the_name_stay_inside_the_output_directory() {
    let services = services();
    services
        .store()
        .set_student_profile(&StudentProfile::new("Ana/Maria", 19, "🌻", "beginner", "web").unwrap())
        .await
        .unwrap();

    let dir = std::env::temp_dir().join(format!("lesson-cert-slash-{}", std::process::id()));
    let path = services.certificates().save_to(&dir).await.unwrap();
    assert_eq!(path.parent(), Some(dir.as_path()));
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("Certificate-Python-Ana_Maria.svg")
    );
    assert!(path.exists());
    let registry = services.store().certificate_registry().await.unwrap();
    assert!(registry.find("Ana/Maria").is_some());
    std::fs::remove_dir_all(&dir).unwrap();
}
