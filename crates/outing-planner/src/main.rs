//! Outing planner CLI.
//!
//! Scrapes the seed page's calendar, cinema and restaurant sections and
//! prints a movie + dinner suggestion for every weekday the whole group is
//! free. With `--book`, the table for the first suggestion is reserved too.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use url::Url;

use outing_planner::{
    BookingOutcome, Credentials, MatchPolicy, PlanMatcher, PlanOutcome, PlannerConfig,
};

#[derive(Parser)]
#[command(name = "outing-planner")]
#[command(about = "Find a day, movie and dinner reservation that work for everyone")]
struct Cli {
    /// Seed URL listing the calendar, cinema and restaurant sections
    url: Url,

    /// Restaurant login user
    #[arg(long, env = "OUTING_USERNAME", default_value = "zeke")]
    username: String,

    /// Restaurant login password
    #[arg(long, env = "OUTING_PASSWORD", default_value = "coys")]
    password: String,

    /// Hours between a movie's start and the earliest acceptable dinner
    #[arg(long, default_value = "2")]
    dinner_buffer_hours: u8,

    /// Book a table for the first suggested plan
    #[arg(long)]
    book: bool,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let matcher = PlanMatcher::new(PlannerConfig {
        credentials: Credentials {
            username: cli.username,
            password: cli.password,
        },
        policy: MatchPolicy {
            dinner_buffer_hours: cli.dinner_buffer_hours,
        },
    });

    match matcher.find_plans(&cli.url).await? {
        PlanOutcome::Plans(plans) => {
            println!("\nSuggestions");
            println!("===========");
            for plan in &plans {
                println!("* {plan}");
            }

            if cli.book {
                if let Some(plan) = plans.first() {
                    match matcher.book_plan(&cli.url, plan).await? {
                        BookingOutcome::Booked => {
                            println!(
                                "\nBooked a table on {} between {}.",
                                plan.day, plan.dinner_window
                            );
                        }
                        BookingOutcome::Failed { status } => {
                            println!(
                                "\nCould not book the table (HTTP {status}); try booking manually."
                            );
                        }
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        PlanOutcome::NoCommonDay => {
            println!("==== There was no available day where all of you could meet! ====");
            Ok(ExitCode::FAILURE)
        }
        PlanOutcome::NoPlanFound => {
            println!("==== There was no available match for both movies and dinner! ====");
            Ok(ExitCode::FAILURE)
        }
    }
}
