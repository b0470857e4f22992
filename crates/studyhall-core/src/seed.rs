//! Demo reference data. Idempotent: re-running updates in place instead of
//! duplicating rows.

use anyhow::Result;
use sqlx::Row;
use tracing::info;

use crate::db::DbPool;

#[derive(Debug)]
struct ShiftSeed {
    name: &'static str,
    start: &'static str,
    end: &'static str,
}

static SHIFT_SEEDS: &[ShiftSeed] = &[
    ShiftSeed { name: "Morning", start: "06:00", end: "12:00" },
    ShiftSeed { name: "Afternoon", start: "12:00", end: "18:00" },
    ShiftSeed { name: "Evening", start: "18:00", end: "23:00" },
    ShiftSeed { name: "Full Day", start: "06:00", end: "23:00" },
];

const SEAT_COUNT: i32 = 20;
const LOCKER_COUNT: i32 = 10;

pub async fn run(pool: &DbPool) -> Result<()> {
    let library_id = seed_library(pool).await?;
    seed_branches(pool, library_id).await?;
    seed_seats(pool, library_id).await?;
    seed_shifts(pool, library_id).await?;
    seed_lockers(pool, library_id).await?;
    Ok(())
}

async fn seed_library(pool: &DbPool) -> Result<i64> {
    let row = sqlx::query(
        r#"
        INSERT INTO libraries (code, library_name, owner_name, timezone)
        VALUES ('DEMO', 'Demo Central Library', 'Demo Owner', 'Asia/Kolkata')
        ON CONFLICT (code) DO UPDATE SET
            library_name = EXCLUDED.library_name,
            owner_name = EXCLUDED.owner_name,
            timezone = EXCLUDED.timezone
        RETURNING library_id
        "#,
    )
    .fetch_one(pool)
    .await?;

    let library_id: i64 = row.try_get("library_id")?;
    info!(code = "DEMO", library_id, "Seeded demo library");
    Ok(library_id)
}

async fn seed_branches(pool: &DbPool, library_id: i64) -> Result<()> {
    for name in ["Main Hall", "Annex"] {
        sqlx::query(
            r#"
            INSERT INTO branches (library_id, name)
            VALUES ($1, $2)
            ON CONFLICT (library_id, name) DO NOTHING
            "#,
        )
        .bind(library_id)
        .bind(name)
        .execute(pool)
        .await?;
    }
    info!("Seeded branches");
    Ok(())
}

async fn seed_seats(pool: &DbPool, library_id: i64) -> Result<()> {
    for seat_number in 1..=SEAT_COUNT {
        sqlx::query(
            r#"
            INSERT INTO seats (library_id, seat_number)
            VALUES ($1, $2)
            ON CONFLICT (library_id, seat_number) DO NOTHING
            "#,
        )
        .bind(library_id)
        .bind(seat_number)
        .execute(pool)
        .await?;
    }
    info!(count = SEAT_COUNT, "Seeded seats");
    Ok(())
}

async fn seed_shifts(pool: &DbPool, library_id: i64) -> Result<()> {
    for shift in SHIFT_SEEDS {
        sqlx::query(
            r#"
            INSERT INTO shifts (library_id, name, start_time, end_time)
            VALUES ($1, $2, $3::time, $4::time)
            ON CONFLICT (library_id, name) DO UPDATE SET
                start_time = EXCLUDED.start_time,
                end_time = EXCLUDED.end_time
            "#,
        )
        .bind(library_id)
        .bind(shift.name)
        .bind(shift.start)
        .bind(shift.end)
        .execute(pool)
        .await?;

        info!(name = shift.name, "Seeded shift");
    }
    Ok(())
}

async fn seed_lockers(pool: &DbPool, library_id: i64) -> Result<()> {
    for locker_number in 1..=LOCKER_COUNT {
        sqlx::query(
            r#"
            INSERT INTO lockers (library_id, locker_number)
            VALUES ($1, $2)
            ON CONFLICT (library_id, locker_number) DO NOTHING
            "#,
        )
        .bind(library_id)
        .bind(locker_number)
        .execute(pool)
        .await?;
    }
    info!(count = LOCKER_COUNT, "Seeded lockers");
    Ok(())
}
