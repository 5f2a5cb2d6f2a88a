use std::{fs::File, path::PathBuf};

use argon2::Argon2;
use argon2::PasswordHasher;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use chrono::Utc;
use clap::Parser;
use diesel::prelude::*;
use diesel_migrations::MigrationHarness;
use hotelier::{
    MIGRATIONS, auth::Role, rooms::manage::RoomForm, schema::rooms,
    schema::users,
};
use uuid::Uuid;

/// Prepares a database: runs migrations, creates the first administrator
/// and optionally imports rooms.
#[derive(Parser)]
struct Seed {
    /// Falls back to `DATABASE_URL`.
    #[clap(long)]
    database_url: Option<String>,
    #[clap(long, default_value = "admin")]
    admin_username: String,
    #[clap(long, default_value = "admin@example.com")]
    admin_email: String,
    /// Password for a newly created administrator.
    #[clap(long, env = "ADMIN_PASSWORD")]
    admin_password: String,
    /// A CSV file of rooms, with one column per room form field.
    #[clap(long)]
    rooms: Option<PathBuf>,
    /// Staff accounts to create, as `username:email:role`. They share
    /// the administrator's initial password.
    #[clap(long = "staff", value_parser = parse_staff)]
    staff: Vec<StaffAccount>,
}

#[derive(Clone, Debug)]
struct StaffAccount {
    username: String,
    email: String,
    role: Role,
}

fn parse_staff(arg: &str) -> Result<StaffAccount, String> {
    let mut parts = arg.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(username), Some(email), Some(role)) => {
            hotelier::validation::is_ascii_no_spaces(username)?;
            hotelier::validation::is_valid_email(email)?;
            Ok(StaffAccount {
                username: username.to_string(),
                email: email.to_string(),
                role: role.parse()?,
            })
        }
        _ => Err(format!("expected username:email:role, got `{arg}`")),
    }
}

fn main() -> Result<(), String> {
    tracing_subscriber::fmt().init();

    let args = Seed::parse();
    let db_url = args
        .database_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or(
            "please either set `DATABASE_URL` or pass the `--database-url` flag",
        )?;

    let mut conn = diesel::SqliteConnection::establish(&db_url)
        .map_err(|e| format!("could not open {db_url}: {e}"))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| format!("failed to run migrations: {e}"))?;

    ensure_admin(&args, &mut conn).map_err(|e| e.to_string())?;
    for account in &args.staff {
        create_staff(account, &args.admin_password, &mut conn)
            .map_err(|e| format!("{}: {e}", account.username))?;
    }

    if let Some(path) = &args.rooms {
        let imported = import_rooms(path, &mut conn)?;
        tracing::info!("imported {imported} room(s)");
    }

    Ok(())
}

fn ensure_admin(
    args: &Seed,
    conn: &mut SqliteConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let existing = users::table
        .filter(users::is_superuser.eq(true))
        .count()
        .get_result::<i64>(conn)?;
    if existing > 0 {
        tracing::info!("a superuser already exists");
        return Ok(());
    }

    if !hotelier::auth::User::<false>::validate_password(&args.admin_password)
    {
        return Err("the admin password must be at least 6 characters".into());
    }

    let password_hash = hash_password(&args.admin_password)?;

    diesel::insert_into(users::table)
        .values((
            users::id.eq(Uuid::now_v7().to_string()),
            users::username.eq(&args.admin_username),
            users::email.eq(&args.admin_email),
            users::password_hash.eq(password_hash),
            users::role.eq(Role::Admin),
            users::is_superuser.eq(true),
            users::created_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;
    tracing::info!("created superuser {}", args.admin_username);

    Ok(())
}

fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| e.to_string())
}

fn create_staff(
    account: &StaffAccount,
    password: &str,
    conn: &mut SqliteConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let taken = users::table
        .filter(
            users::username
                .eq(&account.username)
                .or(users::email.eq(&account.email)),
        )
        .count()
        .get_result::<i64>(conn)?;
    if taken > 0 {
        tracing::warn!("user {} already exists", account.username);
        return Ok(());
    }

    diesel::insert_into(users::table)
        .values((
            users::id.eq(Uuid::now_v7().to_string()),
            users::username.eq(&account.username),
            users::email.eq(&account.email),
            users::password_hash.eq(hash_password(password)?),
            users::role.eq(account.role),
            users::created_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;
    tracing::info!(
        "created {} account {}",
        account.role.as_str(),
        account.username
    );

    Ok(())
}

/// Rows whose room number is already taken are skipped. Any invalid row
/// aborts the import without writing anything.
fn import_rooms(
    path: &PathBuf,
    conn: &mut SqliteConnection,
) -> Result<usize, String> {
    let file = File::open(path)
        .map_err(|e| format!("could not open {}: {e}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut fields = Vec::new();
    for (i, row) in reader.deserialize::<RoomForm>().enumerate() {
        let form = row.map_err(|e| format!("row {}: {e}", i + 1))?;
        let parsed = form.parse().map_err(|errors| {
            let detail = errors
                .iter()
                .map(|(field, msg)| format!("{field} {msg}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("row {}: {detail}", i + 1)
        })?;
        fields.push(parsed);
    }

    conn.transaction(|conn| -> QueryResult<usize> {
        let mut imported = 0;
        for room in fields {
            if room.room_number_taken(None, conn)? {
                tracing::warn!("room {} already exists", room.room_number);
                continue;
            }
            diesel::insert_into(rooms::table)
                .values(&room.into_room())
                .execute(conn)?;
            imported += 1;
        }
        Ok(imported)
    })
    .map_err(|e| format!("import failed: {e}"))
}
