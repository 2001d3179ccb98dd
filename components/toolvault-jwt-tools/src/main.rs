use clap::{Args, Parser, Subcommand};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Toolvault JWT tools.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a new bearer token for the Toolvault API.
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Secret key used to sign JWT token (`security.jwt_secret`).
    #[arg(short, long)]
    secret: String,
    /// JWT `sub` claim, a user UUID. A fresh one is generated when omitted.
    #[arg(long)]
    sub: Option<Uuid>,
    /// JWT `email` claim.
    #[arg(long)]
    email: String,
    /// Marks the user as an administrator.
    #[arg(long, default_value_t = false)]
    admin: bool,
    /// JWT `exp` claim.
    #[arg(long)]
    exp: humantime::Duration,
}

fn main() -> Result<(), anyhow::Error> {
    let args = Cli::parse();
    match &args.command {
        Commands::Generate(generate_args) => {
            let exp = OffsetDateTime::now_utc() + *generate_args.exp.as_ref();
            let sub = generate_args.sub.unwrap_or_else(Uuid::now_v7);
            let jwt = encode(
                &Header::default(),
                &json!({
                    "sub": sub,
                    "email": generate_args.email,
                    "admin": generate_args.admin,
                    "exp": exp.unix_timestamp(),
                }),
                &EncodingKey::from_secret(generate_args.secret.as_bytes()),
            )?;
            println!("{jwt}");
        }
    }

    Ok(())
}
