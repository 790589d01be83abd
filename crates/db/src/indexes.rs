use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Sessions. The partial unique index is the transactional guard for
    // "at most one recording session per stylist": a concurrent second
    // start hits a duplicate-key error instead of racing the check.
    create_indexes(
        db,
        "sessions",
        vec![
            index_partial_unique(
                bson::doc! { "stylist_id": 1 },
                bson::doc! { "status": "recording" },
            ),
            index(bson::doc! { "salon_id": 1, "started_at": -1 }),
            index(bson::doc! { "stylist_id": 1, "started_at": -1 }),
        ],
    )
    .await?;

    // Audio Chunks
    create_indexes(
        db,
        "audio_chunks",
        vec![
            index_unique(bson::doc! { "session_id": 1, "chunk_index": 1 }),
            index(bson::doc! { "session_id": 1, "status": 1 }),
        ],
    )
    .await?;

    // Transcripts
    create_indexes(
        db,
        "transcripts",
        vec![index_unique(
            bson::doc! { "session_id": 1, "chunk_index": 1 },
        )],
    )
    .await?;

    // Speaker Segments. The time-range key makes merge writes idempotent
    // under repeated diarization callback delivery.
    create_indexes(
        db,
        "speaker_segments",
        vec![
            index_unique(bson::doc! {
                "session_id": 1,
                "chunk_index": 1,
                "start_time_ms": 1,
                "end_time_ms": 1,
            }),
            index(bson::doc! { "session_id": 1, "start_time_ms": 1 }),
        ],
    )
    .await?;

    // Chunk Analyses
    create_indexes(
        db,
        "chunk_analyses",
        vec![index_unique(
            bson::doc! { "session_id": 1, "chunk_index": 1 },
        )],
    )
    .await?;

    // Session Reports
    create_indexes(
        db,
        "session_reports",
        vec![index_unique(bson::doc! { "session_id": 1 })],
    )
    .await?;

    // Pipeline Tasks
    create_indexes(
        db,
        "pipeline_tasks",
        vec![
            index_unique(bson::doc! { "session_id": 1, "stage": 1 }),
            index(bson::doc! { "status": 1, "updated_at": 1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn index_partial_unique(keys: bson::Document, filter: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(filter)
                .build(),
        )
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
