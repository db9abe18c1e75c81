use crate::{
    core::{seed_demo_data, Extractor, TripPlanner},
    services::{
        completion_client::{DEFAULT_CHAT_BASE_URL, DEFAULT_COMPLETION_URL},
        HttpCompletionClient,
    },
    store::LocalStore,
    types::{
        AccommodationPreference, Expense, TransportationPreference, TripRequest, TripStatus,
    },
};
use anyhow::{anyhow, bail, Context};
use chrono::{Local, NaiveDate};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::{env, io::Read, sync::Arc, time::Duration};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_STORE_PATH: &str = "tripai-store.json";
const DEFAULT_USER: &str = "local-user";

fn user_arg() -> Arg {
    Arg::new("user")
        .long("user")
        .value_name("USER_ID")
        .help("Owner of the trips")
        .default_value(DEFAULT_USER)
}

fn trip_id_arg() -> Arg {
    Arg::new("trip-id")
        .help("Id of the trip")
        .required(true)
        .index(1)
}

fn command() -> Command {
    Command::new("tripai")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Plan trips with LLM-generated itineraries and track their budgets")
        .subcommand_required(true)
        .arg(
            Arg::new("store")
                .long("store")
                .value_name("PATH")
                .global(true)
                .help("JSON file holding trips and budgets (or set TRIPAI_STORE)"),
        )
        .arg(
            Arg::new("endpoint")
                .short('u')
                .long("endpoint")
                .value_name("URL")
                .global(true)
                .help("Completion endpoint URL, or the chat completions base URL with --model"),
        )
        .arg(
            Arg::new("api-key")
                .short('k')
                .long("api-key")
                .value_name("KEY")
                .global(true)
                .help("API key for the completion endpoint (or set OPENAI_API_KEY)"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("MODEL")
                .global(true)
                .help("Use an OpenAI-compatible chat completions API with this model"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("SECONDS")
                .global(true)
                .help("Completion timeout in seconds")
                .value_parser(value_parser!(u64))
                .default_value("120"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Validate itineraries against the full schema"),
        )
        .subcommand(
            Command::new("plan")
                .about("Generate an itinerary and save the trip")
                .arg(
                    Arg::new("destination")
                        .help("Where to go")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("start")
                        .long("start")
                        .value_name("YYYY-MM-DD")
                        .required(true)
                        .value_parser(value_parser!(NaiveDate)),
                )
                .arg(
                    Arg::new("end")
                        .long("end")
                        .value_name("YYYY-MM-DD")
                        .required(true)
                        .value_parser(value_parser!(NaiveDate)),
                )
                .arg(
                    Arg::new("budget")
                        .long("budget")
                        .value_name("AMOUNT")
                        .required(true)
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("interests")
                        .long("interests")
                        .value_name("LIST")
                        .help("Comma-separated interests, e.g. \"Museums, Food & Dining\""),
                )
                .arg(
                    Arg::new("group-size")
                        .long("group-size")
                        .value_name("COUNT")
                        .value_parser(value_parser!(u32))
                        .default_value("1"),
                )
                .arg(
                    Arg::new("accommodation")
                        .long("accommodation")
                        .value_name("STYLE")
                        .help("budget, mid-range, luxury or flexible")
                        .value_parser(value_parser!(AccommodationPreference)),
                )
                .arg(
                    Arg::new("transportation")
                        .long("transportation")
                        .value_name("MODE")
                        .help("flight, train, car, bus or flexible")
                        .value_parser(value_parser!(TransportationPreference)),
                )
                .arg(
                    Arg::new("no-save")
                        .long("no-save")
                        .action(ArgAction::SetTrue)
                        .help("Print the itinerary without saving the trip"),
                )
                .arg(user_arg()),
        )
        .subcommand(
            Command::new("extract")
                .about("Recover an itinerary from raw completion text")
                .arg(
                    Arg::new("file")
                        .help("File holding the completion text; reads stdin when omitted")
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("trips")
                .about("List saved trips")
                .arg(user_arg()),
        )
        .subcommand(
            Command::new("show")
                .about("Show a trip and its itinerary")
                .arg(trip_id_arg()),
        )
        .subcommand(
            Command::new("status")
                .about("Change the status of a trip")
                .arg(trip_id_arg())
                .arg(
                    Arg::new("status")
                        .help("planned, ongoing or completed")
                        .required(true)
                        .index(2)
                        .value_parser(value_parser!(TripStatus)),
                ),
        )
        .subcommand(
            Command::new("expense")
                .about("Record an expense against a trip")
                .arg(trip_id_arg())
                .arg(
                    Arg::new("category")
                        .long("category")
                        .required(true)
                        .value_name("CATEGORY"),
                )
                .arg(
                    Arg::new("amount")
                        .long("amount")
                        .required(true)
                        .value_name("AMOUNT")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("description")
                        .long("description")
                        .value_name("TEXT")
                        .help("Defaults to the category"),
                )
                .arg(
                    Arg::new("date")
                        .long("date")
                        .value_name("YYYY-MM-DD")
                        .help("Defaults to today")
                        .value_parser(value_parser!(NaiveDate)),
                ),
        )
        .subcommand(
            Command::new("allocate")
                .about("Set the allocation of a budget category")
                .arg(trip_id_arg())
                .arg(
                    Arg::new("category")
                        .help("Budget category")
                        .required(true)
                        .index(2),
                )
                .arg(
                    Arg::new("amount")
                        .help("Amount to allocate")
                        .required(true)
                        .index(3)
                        .value_parser(value_parser!(f64)),
                ),
        )
        .subcommand(
            Command::new("budget")
                .about("Show spending against the trip budget")
                .arg(trip_id_arg()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a trip with its itinerary, budget and expenses")
                .arg(trip_id_arg()),
        )
        .subcommand(
            Command::new("seed-demo")
                .about("Create sample trips")
                .arg(user_arg()),
        )
}

fn completion_client(matches: &ArgMatches) -> anyhow::Result<HttpCompletionClient> {
    resolve_client(matches, |key| env::var(key).ok())
}

/// Flags win over the environment read through `lookup`
fn resolve_client(
    matches: &ArgMatches,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<HttpCompletionClient> {
    let api_key = matches
        .get_one::<String>("api-key")
        .cloned()
        .or_else(|| lookup("OPENAI_API_KEY"));
    let endpoint = matches.get_one::<String>("endpoint").cloned();
    let model = matches
        .get_one::<String>("model")
        .cloned()
        .or_else(|| lookup("TRIPAI_MODEL"));
    let timeout = Duration::from_secs(*matches.get_one::<u64>("timeout").unwrap_or(&120));

    let client = match model {
        Some(model) => {
            let api_key = api_key.context(
                "an API key is required with a chat model. Set OPENAI_API_KEY or use --api-key",
            )?;
            let base_url = endpoint
                .or_else(|| lookup("OPENAI_BASE_URL"))
                .or_else(|| lookup("OPENROUTER_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_CHAT_BASE_URL.to_string());
            info!(target: "tripai::cli", model = %model, base_url = %base_url, "using chat completions");
            HttpCompletionClient::chat(base_url, model).with_api_key(api_key)
        }
        None => {
            let url = endpoint
                .or_else(|| lookup("TRIPAI_COMPLETION_URL"))
                .unwrap_or_else(|| DEFAULT_COMPLETION_URL.to_string());
            let client = HttpCompletionClient::new(url);
            match api_key {
                Some(key) => client.with_api_key(key),
                None => client,
            }
        }
    };

    Ok(client.with_timeout(timeout))
}

/// Only `plan` talks to the completion endpoint
fn planner_client(name: &str, matches: &ArgMatches) -> anyhow::Result<HttpCompletionClient> {
    if name == "plan" {
        completion_client(matches)
    } else {
        Ok(HttpCompletionClient::default())
    }
}

fn extractor(matches: &ArgMatches) -> Extractor {
    if matches.get_flag("strict") {
        Extractor::strict()
    } else {
        Extractor::new()
    }
}

async fn open_store(matches: &ArgMatches) -> anyhow::Result<Arc<LocalStore>> {
    let path = matches
        .get_one::<String>("store")
        .cloned()
        .or_else(|| env::var("TRIPAI_STORE").ok())
        .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string());
    let store = LocalStore::open(&path)
        .await
        .with_context(|| format!("could not open store `{}`", path))?;
    Ok(Arc::new(store))
}

fn required<'a, T: Clone + Send + Sync + 'static>(
    matches: &'a ArgMatches,
    id: &str,
) -> anyhow::Result<&'a T> {
    matches
        .get_one::<T>(id)
        .ok_or_else(|| anyhow!("missing argument `{}`", id))
}

fn read_input(file: Option<&String>) -> anyhow::Result<String> {
    match file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("could not read `{}`", path))
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("could not read stdin")?;
            Ok(buffer)
        }
    }
}

/// CLI entry point for the tripai tool
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = command().get_matches();
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("a subcommand is required"))?;

    if name == "extract" {
        let raw = read_input(sub.get_one::<String>("file"))?;
        let extracted = extractor(&matches)
            .extract_with_stage(&raw)
            .map_err(|err| anyhow!("{} ({})", err, err.reason().as_str()))?;
        info!(target: "tripai::cli", stage = %extracted.stage, "itinerary recovered");
        println!("{}", serde_json::to_string_pretty(&extracted.itinerary)?);
        return Ok(());
    }

    let store = open_store(&matches).await?;
    if name == "seed-demo" {
        let user = required::<String>(sub, "user")?;
        let ids = seed_demo_data(store.as_ref(), user).await?;
        println!("Seeded {} demo trips for {}", ids.len(), user);
        for id in ids {
            println!("  {}", id);
        }
        return Ok(());
    }

    let client = planner_client(name, &matches)?;
    let timeout = Duration::from_secs(*required::<u64>(&matches, "timeout")?);
    let planner = TripPlanner::new(Arc::new(client), store)
        .with_extractor(extractor(&matches))
        .with_timeout(timeout);

    match name {
        "plan" => {
            let mut request = TripRequest::new(
                required::<String>(sub, "destination")?.as_str(),
                *required::<NaiveDate>(sub, "start")?,
                *required::<NaiveDate>(sub, "end")?,
                *required::<f64>(sub, "budget")?,
            )
            .with_group_size(*required::<u32>(sub, "group-size")?);
            if let Some(list) = sub.get_one::<String>("interests") {
                request = request.with_custom_interests(list);
            }
            if let Some(style) = sub.get_one::<AccommodationPreference>("accommodation") {
                request = request.with_accommodation(*style);
            }
            if let Some(mode) = sub.get_one::<TransportationPreference>("transportation") {
                request = request.with_transportation(*mode);
            }

            if sub.get_flag("no-save") {
                let plan = planner.generate_itinerary(&request).await?;
                println!("{}", plan.summary());
                return Ok(());
            }

            let user = required::<String>(sub, "user")?;
            match planner.plan_trip(user, &request).await {
                Ok(planned) => {
                    println!("{}", planned.plan.summary());
                    println!("\nSaved trip {}", planned.trip_id);
                }
                Err(err) => {
                    error!(target: "tripai::cli", code = err.error_code(), "planning failed: {}", err);
                    return Err(err.into());
                }
            }
        }
        "trips" => {
            let user = required::<String>(sub, "user")?;
            let trips = planner.trips_for_user(user).await?;
            if trips.is_empty() {
                println!("No trips for {}", user);
            }
            for trip in trips {
                println!(
                    "{}  {:<24} {} .. {}  {:>10.2} {}  {}",
                    trip.id,
                    trip.record.destination,
                    trip.record.start_date,
                    trip.record.end_date,
                    trip.record.total_budget,
                    trip.record.currency,
                    trip.record.status
                );
            }
        }
        "show" => {
            let trip_id = required::<String>(sub, "trip-id")?;
            let trip = planner
                .trip(trip_id)
                .await?
                .ok_or_else(|| anyhow!("trip `{}` not found", trip_id))?;
            println!("{}", serde_json::to_string_pretty(&trip)?);
            match planner.itinerary_for_trip(trip_id).await? {
                Some(itinerary) => {
                    println!("{}", serde_json::to_string_pretty(&itinerary.record)?)
                }
                None => println!("No itinerary saved for this trip"),
            }
        }
        "status" => {
            let trip_id = required::<String>(sub, "trip-id")?;
            let status = *required::<TripStatus>(sub, "status")?;
            let trip = planner.update_trip_status(trip_id, status).await?;
            println!("Trip {} is now {}", trip.id, trip.record.status);
        }
        "expense" => {
            let trip_id = required::<String>(sub, "trip-id")?;
            let date = sub
                .get_one::<NaiveDate>("date")
                .copied()
                .unwrap_or_else(|| Local::now().date_naive());
            let category = required::<String>(sub, "category")?;
            let description = sub.get_one::<String>("description").unwrap_or(category);
            let expense = Expense::new(
                trip_id.as_str(),
                category.as_str(),
                description.as_str(),
                *required::<f64>(sub, "amount")?,
                date,
            );
            let stored = planner.add_expense(expense).await?;
            println!("Recorded expense {}", stored.id);
        }
        "allocate" => {
            let trip_id = required::<String>(sub, "trip-id")?;
            let category = required::<String>(sub, "category")?;
            let amount = *required::<f64>(sub, "amount")?;
            let row = planner.allocate_budget(trip_id, category, amount).await?;
            println!(
                "Allocated {:.2} {} to {}",
                row.record.allocated_amount, row.record.currency, row.record.category
            );
        }
        "budget" => {
            let trip_id = required::<String>(sub, "trip-id")?;
            println!("{}", planner.budget_summary(trip_id).await?.render());
        }
        "delete" => {
            let trip_id = required::<String>(sub, "trip-id")?;
            planner.delete_trip(trip_id).await?;
            println!("Deleted trip {}", trip_id);
        }
        other => bail!("unknown subcommand `{}`", other),
    }

    Ok(())
}
