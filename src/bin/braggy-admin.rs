use anyhow::{anyhow, Context, Result};
use braggy::{
    identity::{ClerkConfig, ClerkDirectory, ProfileDirectory, DEFAULT_CLERK_API_URL},
    request::parse_date,
    subscription::{apply_subscription_change, has_unrestricted_access, ProfileMetadata, SubscriptionChange},
};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// Inspect and correct subscription metadata on identity provider user records.
#[derive(Parser)]
#[command(name = "braggy-admin", version)]
struct Cli {
    /// Backend API secret key
    #[arg(long, env = "CLERK_SECRET_KEY", hide_env_values = true)]
    secret_key: String,

    #[arg(long, env = "CLERK_API_URL", default_value = DEFAULT_CLERK_API_URL)]
    api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a user's metadata and access verdict
    Show { user_id: String },
    /// Force a user onto a tier
    Set {
        user_id: String,
        #[arg(value_enum)]
        tier: Tier,
        /// Length of a premium period
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Mark a subscription canceled, keeping access until the end date
    Cancel {
        user_id: String,
        /// Access end (RFC 3339 or YYYY-MM-DD); defaults to the stored end date
        #[arg(long)]
        end: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Tier {
    Premium,
    Free,
}

const MAX_PERIOD_DAYS: i64 = 100 * 365;

fn period_end(start: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    if !(1..=MAX_PERIOD_DAYS).contains(&days) {
        return Err(anyhow!("--days must be between 1 and {MAX_PERIOD_DAYS}"));
    }
    start
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| anyhow!("--days {days} overflows the calendar"))
}

fn report(user_id: &str, bag: &serde_json::Map<String, Value>) -> Result<()> {
    let profile = ProfileMetadata::from_bag(bag).context("metadata is malformed")?;
    let unrestricted = has_unrestricted_access(None, &profile, Utc::now());

    println!("user:        {user_id}");
    println!("tier:        {}", profile.tier());
    println!("canceled:    {}", profile.is_canceled());
    println!(
        "ends:        {}",
        profile
            .subscription_end_date
            .map_or_else(|| "none".to_owned(), |end| end.to_rfc3339())
    );
    println!("unlimited:   {unrestricted}");
    println!("{}", serde_json::to_string_pretty(bag)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let directory = ClerkDirectory::new(ClerkConfig {
        secret_key: cli.secret_key,
        api_url: cli.api_url,
    })?;
    let now = Utc::now();

    let (user_id, change) = match cli.command {
        Command::Show { user_id } => {
            let bag = directory.public_metadata(&user_id).await?;
            return report(&user_id, &bag);
        }
        Command::Set {
            user_id,
            tier: Tier::Premium,
            days,
        } => {
            let change = SubscriptionChange::Activate {
                start: now,
                end: Some(period_end(now, days)?),
            };
            (user_id, change)
        }
        Command::Set {
            user_id,
            tier: Tier::Free,
            ..
        } => (user_id, SubscriptionChange::Downgrade),
        Command::Cancel { user_id, end } => {
            let end = end
                .map(|end| parse_date(&end).ok_or_else(|| anyhow!("unrecognised date {end:?}")))
                .transpose()?;
            (user_id, SubscriptionChange::Cancel { end })
        }
    };

    apply_subscription_change(&directory, &user_id, &change, now)
        .await
        .with_context(|| format!("updating {user_id}"))?;
    let bag = directory.public_metadata(&user_id).await?;
    report(&user_id, &bag)
}
