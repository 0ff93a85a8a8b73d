use std::collections::BTreeSet;

use chrono::Duration;
use drill_core::model::{
    Filters, Mood, Pronoun, QuestionSeed, RawFilters, Resolution, RoundStatus, Tense,
};
use drill_core::time::fixed_now;
use storage::repository::{
    CoverageQuery, CoverageRepository, GuessRepository, NewRoundRecord, RoundRepository,
    StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    SqliteRepository::open(&url).await.expect("open")
}

fn seed(verb: &str, pronoun: Pronoun, tense: Tense, mood: Mood, answer: &str) -> QuestionSeed {
    QuestionSeed {
        verb: verb.into(),
        pronoun,
        tense,
        mood,
        correct_answer: answer.into(),
    }
}

fn new_round(minutes: i64, seeds: Vec<QuestionSeed>) -> NewRoundRecord {
    let filters = Filters::validate(&RawFilters {
        pronouns: Some(vec!["yo".into(), "él/ella/usted".into()]),
        moods: Some(vec!["indicative".into(), "subjunctive".into()]),
        num_questions: Some(5),
        allow_retry: Some(true),
        ..RawFilters::default()
    })
    .unwrap();
    NewRoundRecord {
        filters,
        started_at: fixed_now() + Duration::minutes(minutes),
        seeds,
    }
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_filters_and_order() {
    let repo = connect("memdb_roundtrip").await;

    let record = new_round(
        0,
        vec![
            seed("hablar", Pronoun::Yo, Tense::Present, Mood::Indicative, "hablo"),
            seed("ser", Pronoun::El, Tense::Preterite, Mood::Indicative, "fue"),
            seed("ir", Pronoun::Usted, Tense::Present, Mood::Subjunctive, "vaya"),
        ],
    );
    let filters = record.filters.clone();
    let created = repo.create_round(record).await.unwrap();

    let fetched = repo.get_round(created.round.id()).await.unwrap().unwrap();
    assert_eq!(fetched.round.filters(), &filters);
    assert!(fetched.round.filters().allow_retry());
    assert_eq!(fetched.round.num_questions(), 3);
    assert_eq!(fetched.round.status(), RoundStatus::Active);
    let answers: Vec<_> = fetched.guesses.iter().map(|g| g.correct_answer()).collect();
    assert_eq!(answers, vec!["hablo", "fue", "vaya"]);
    assert_eq!(fetched.guesses, created.guesses);
}

#[tokio::test]
async fn sqlite_rejects_second_active_round() {
    let repo = connect("memdb_single_active").await;

    repo.create_round(new_round(
        0,
        vec![seed("hablar", Pronoun::Yo, Tense::Present, Mood::Indicative, "hablo")],
    ))
    .await
    .unwrap();

    let err = repo
        .create_round(new_round(
            1,
            vec![seed("comer", Pronoun::Yo, Tense::Present, Mood::Indicative, "como")],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::ActiveRoundExists));
    // the rejected insert left no guesses behind
    let bins = repo.coverage_bins(&CoverageQuery::default()).await.unwrap();
    assert_eq!(bins.iter().map(|b| b.question_count).sum::<u32>(), 1);
}

#[tokio::test]
async fn sqlite_complete_is_idempotent() {
    let repo = connect("memdb_complete").await;
    let created = repo
        .create_round(new_round(
            0,
            vec![
                seed("hablar", Pronoun::Yo, Tense::Present, Mood::Indicative, "hablo"),
                seed("comer", Pronoun::Yo, Tense::Present, Mood::Indicative, "como"),
            ],
        ))
        .await
        .unwrap();
    let id = created.round.id();

    let end = fixed_now() + Duration::minutes(4);
    let first = repo.complete_round(id, end, 1).await.unwrap();
    assert_eq!(first.status(), RoundStatus::Completed);
    assert_eq!(first.ended_at(), Some(end));

    let second = repo
        .complete_round(id, end + Duration::minutes(10), 2)
        .await
        .unwrap();
    assert_eq!(second, first);
    assert!(repo.active_round().await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_transition_is_atomic() {
    let repo = connect("memdb_transition").await;
    let first = repo
        .create_round(new_round(
            0,
            vec![seed("hablar", Pronoun::Yo, Tense::Present, Mood::Indicative, "hablo")],
        ))
        .await
        .unwrap();

    let (completed, next) = repo
        .transition_round(
            first.round.id(),
            fixed_now() + Duration::minutes(2),
            1,
            new_round(
                3,
                vec![seed("vivir", Pronoun::Yo, Tense::Present, Mood::Indicative, "vivo")],
            ),
        )
        .await
        .unwrap();
    assert_eq!(completed.status(), RoundStatus::Completed);
    assert_eq!(completed.num_correct_answers(), 1);
    assert!(next.round.is_active());

    let active = repo.active_round().await.unwrap().unwrap();
    assert_eq!(active.round.id(), next.round.id());

    let history = repo.list_rounds(10).await.unwrap();
    let ids: Vec<_> = history.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![next.round.id(), first.round.id()]);
}

#[tokio::test]
async fn sqlite_finalize_guess_only_once() {
    let repo = connect("memdb_finalize").await;
    let created = repo
        .create_round(new_round(
            0,
            vec![
                seed("hablar", Pronoun::Yo, Tense::Present, Mood::Indicative, "hablo"),
                seed("comer", Pronoun::Yo, Tense::Present, Mood::Indicative, "como"),
            ],
        ))
        .await
        .unwrap();
    let answered_id = created.guesses[0].id();
    let skipped_id = created.guesses[1].id();

    let answered = repo
        .finalize_guess(
            answered_id,
            &Resolution::Answered {
                user_answer: "hablo".into(),
                is_correct: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(answered.user_answer(), Some("hablo"));
    assert_eq!(answered.is_correct(), Some(true));

    let skipped = repo
        .finalize_guess(skipped_id, &Resolution::Skipped)
        .await
        .unwrap();
    assert!(skipped.skipped());
    assert_eq!(skipped.is_correct(), Some(false));

    let err = repo
        .finalize_guess(
            skipped_id,
            &Resolution::Answered {
                user_answer: "como".into(),
                is_correct: true,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::AlreadyFinalized));

    let err = repo
        .finalize_guess(drill_core::model::GuessId::new(9_999), &Resolution::Skipped)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_coverage_groups_and_filters() {
    let repo = connect("memdb_coverage").await;
    let first = repo
        .create_round(new_round(
            0,
            vec![
                seed("hablar", Pronoun::Yo, Tense::Present, Mood::Indicative, "hablo"),
                seed("comer", Pronoun::Yo, Tense::Present, Mood::Indicative, "como"),
                seed("ir", Pronoun::Yo, Tense::Present, Mood::Subjunctive, "vaya"),
            ],
        ))
        .await
        .unwrap();
    repo.transition_round(
        first.round.id(),
        fixed_now() + Duration::minutes(5),
        0,
        new_round(
            60,
            vec![seed("vivir", Pronoun::Yo, Tense::Present, Mood::Indicative, "vivo")],
        ),
    )
    .await
    .unwrap();

    let all = repo.coverage_bins(&CoverageQuery::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].mood, Mood::Indicative);
    assert_eq!(all[0].question_count, 3);

    let subjunctive = repo
        .coverage_bins(&CoverageQuery {
            moods: Some(BTreeSet::from([Mood::Subjunctive])),
            ..CoverageQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(subjunctive.len(), 1);
    assert_eq!(subjunctive[0].question_count, 1);

    let early = repo
        .coverage_bins(&CoverageQuery {
            created_until: Some(fixed_now() + Duration::minutes(30)),
            ..CoverageQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(
        early.iter().map(|b| b.question_count).sum::<u32>(),
        3,
        "the second round started after the window"
    );

    let dense = repo
        .coverage_bins(&CoverageQuery {
            min_questions: 2,
            ..CoverageQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(dense.len(), 1);
}
