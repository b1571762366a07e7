use std::io::BufRead;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use moodtune::analyzer;
use moodtune::config::AppConfig;
use moodtune::mood::{MoodSample, MoodTracker};
use moodtune::provider::{QueryParams, SpotifyClient};
use moodtune::recommend::{Recommendation, Recommender};

#[derive(Parser)]
#[command(name = "moodtune", version, about = "Mood- and text-driven music recommender")]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend tracks for a free-text preference or a mood
    Recommend {
        /// What you feel like listening to
        #[arg(trailing_var_arg = true)]
        preference: Vec<String>,

        /// Recommend for a detected mood instead (neutral, happy, sad, ...)
        #[arg(long, conflicts_with = "preference")]
        mood: Option<String>,

        /// Detection confidence for --mood (0-1)
        #[arg(long, requires = "mood")]
        confidence: Option<f64>,
    },

    /// Show the feature vector, intent, and provider query for some text
    Analyze {
        text: Vec<String>,
    },

    /// Check provider credentials and reachability
    Health,

    /// List the genre seeds the provider accepts
    Genres,

    /// Read `label confidence` lines from stdin and re-recommend on stable mood changes
    Watch,

    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let mut config = AppConfig::load();

    match cli.command {
        Commands::Recommend { preference, mood, confidence } => {
            let recommender = recommender(&config);
            let rec = match mood {
                Some(mood) => recommender.recommend_mood(&mood, confidence),
                None => recommender.recommend(&preference.join(" ")),
            }
            .context("Recommendation failed")?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rec)?);
            } else {
                print_recommendation(&rec);
            }
        }

        Commands::Analyze { text } => {
            let text = text.join(" ");
            let vector = analyzer::analyze(&text);
            let intent = analyzer::extract_intent(&text);
            let params = QueryParams::from_intent(&intent, config.provider.limit);

            if cli.json {
                let out = serde_json::json!({
                    "featureVector": vector,
                    "intent": intent,
                    "query": params.to_pairs().into_iter().collect::<std::collections::BTreeMap<_, _>>(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }

            let [energy, tempo, dance, mood, popularity] = vector.0;
            println!("Feature vector:");
            println!("  {:<13} {:>5.3}", "energy", energy);
            println!("  {:<13} {:>5.3}", "tempo", tempo);
            println!("  {:<13} {:>5.3}", "danceability", dance);
            println!("  {:<13} {:>5.3}", "mood", mood);
            println!("  {:<13} {:>5.3}", "popularity", popularity);
            println!();
            println!("Intent:");
            println!("  genres      {}", intent.genres.join(", "));
            println!("  tempo       {}", opt_label(intent.tempo));
            println!("  energy      {}", opt_label(intent.energy));
            println!("  popularity  {}", opt_label(intent.popularity));
            println!(
                "  moods       {}",
                intent.moods.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
            );
            println!();
            println!("Provider query:");
            for (key, value) in params.to_pairs() {
                println!("  {key:<18} {value}");
            }
        }

        Commands::Health => {
            let health = recommender(&config).health();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                println!("Provider: {:?} (token {:?})", health.status, health.token);
                println!("  {}", health.message);
                if let Some(err) = &health.last_error {
                    println!("  last error: {err}");
                }
            }
        }

        Commands::Genres => {
            let genres = recommender(&config).genre_seeds();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&genres)?);
            } else {
                println!("{} genre seeds:", genres.len());
                for g in genres {
                    println!("  {g}");
                }
            }
        }

        Commands::Watch => {
            let recommender = recommender(&config);
            let mut tracker = MoodTracker::default();
            let stdin = std::io::stdin();

            for line in stdin.lock().lines() {
                let line = line.context("Failed to read stdin")?;
                if line.trim().is_empty() {
                    continue;
                }
                let sample = match MoodSample::parse_line(&line) {
                    Ok(s) => s,
                    Err(e) => {
                        log::warn!("Skipping sample: {e}");
                        continue;
                    }
                };
                let Some(mood) = tracker.observe(sample, Instant::now()) else {
                    continue;
                };

                let rec = recommender
                    .recommend(mood.preference_text())
                    .context("Recommendation failed")?;
                if cli.json {
                    println!("{}", serde_json::to_string(&rec)?);
                } else {
                    println!("Mood: {mood}");
                    print_recommendation(&rec);
                    println!();
                }
            }
        }

        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(moodtune::server::run(config))?;
        }
    }

    Ok(())
}

fn recommender(config: &AppConfig) -> Recommender<SpotifyClient> {
    Recommender::new(SpotifyClient::new(&config.provider), config)
}

fn opt_label<T: serde::Serialize>(value: Option<T>) -> String {
    value
        .and_then(|v| serde_json::to_value(v).ok())
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "-".to_string())
}

/// Print a ranked recommendation table.
fn print_recommendation(rec: &Recommendation) {
    println!(
        "{} recommendations for \"{}\" (source: {:?})",
        rec.recommendations.len(),
        rec.query,
        rec.source
    );
    println!();
    println!(
        "{:<30} {:<22} {:>5}  {:>4} {:>4} {:>4} {:>4}",
        "Title", "Artist", "Sim", "Eng", "BPM", "Dnc", "Val"
    );
    println!("{}", "-".repeat(82));

    for t in &rec.recommendations {
        let (energy, tempo, dance, valence) = match &t.audio_features {
            Some(f) => (
                format!("{:.2}", f.energy),
                format!("{:.0}", f.tempo),
                format!("{:.2}", f.danceability),
                format!("{:.2}", f.valence),
            ),
            None => ("-".into(), "-".into(), "-".into(), "-".into()),
        };
        println!(
            "{:<30} {:<22} {:>5.3}  {:>4} {:>4} {:>4} {:>4}",
            truncate(&t.title, 30),
            truncate(&t.artist, 22),
            t.similarity,
            energy,
            tempo,
            dance,
            valence,
        );
    }
}

/// Truncate long strings for table columns, on a char boundary.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}
