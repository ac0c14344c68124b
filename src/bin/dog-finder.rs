//! dog-finder - command line front end for the dog catalog

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dog_finder::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Search adoptable dogs, page through results and ask for a match
#[derive(Parser, Debug)]
#[command(name = "dog-finder")]
#[command(version)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Catalog base URL (overrides config and environment)
    #[arg(long)]
    base_url: Option<String>,

    /// Name used to sign in (overrides config)
    #[arg(long, env = "DOG_FINDER_NAME")]
    name: Option<String>,

    /// Email used to sign in (overrides config)
    #[arg(long, env = "DOG_FINDER_EMAIL")]
    email: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every breed in the catalog
    Breeds,

    /// Search the catalog and print result pages
    Search {
        /// Breed to include (repeatable)
        #[arg(long = "breed")]
        breeds: Vec<String>,

        /// Minimum age in years
        #[arg(long, default_value = "")]
        age_min: String,

        /// Maximum age in years
        #[arg(long, default_value = "")]
        age_max: String,

        /// Comma-separated zip codes
        #[arg(long, default_value = "")]
        zip_codes: String,

        /// Sort breeds descending
        #[arg(long)]
        desc: bool,

        /// Number of pages to print
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// Favorite every dog shown, then ask for a match
        #[arg(long = "match")]
        match_shown: bool,
    },

    /// Ask for a match among the given dog ids
    Match {
        /// Favorite dog ids
        ids: Vec<String>,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dog_finder=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut layers = Vec::new();
    if let Some(path) = &args.config {
        let path = path.to_str().context("config path is not valid UTF-8")?;
        layers.push(ClientConfig::from_yaml_file(path)?);
    }
    let mut config = ClientConfig::merge(layers).with_env_overrides()?;
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
        config.validate()?;
    }
    Ok(config)
}

fn credentials(args: &Args, config: &ClientConfig) -> Result<Credentials> {
    let (name, email) = match (&args.name, &args.email, &config.login) {
        (Some(name), Some(email), _) => (name.clone(), email.clone()),
        (name, email, Some(login)) => (
            name.clone().unwrap_or_else(|| login.name.clone()),
            email.clone().unwrap_or_else(|| login.email.clone()),
        ),
        _ => bail!("sign-in details missing: pass --name and --email or set `login` in the config"),
    };
    Ok(LoginForm::new(name, email).into_credentials()?)
}

fn print_page(table: &ResultTable) {
    println!(
        "Page {} ({} dogs total, sorted by {})",
        table.page_index() + 1,
        table.total(),
        table.sort()
    );
    for dog in table.rows() {
        let mark = if table.is_selected(&dog.id) { "*" } else { " " };
        println!(
            "{} {:<22} {:<28} {:>3}  {}  [{}]",
            mark, dog.name, dog.breed, dog.age, dog.zip_code, dog.id
        );
    }
}

fn check(outcome: FetchOutcome) -> Result<()> {
    match outcome {
        FetchOutcome::Failed { error, .. } => Err(error.into()),
        _ => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(&args)?;

    let client = HttpCatalogClient::new(&config)?;
    client.login(&credentials(&args, &config)?).await?;
    let service: Arc<dyn CatalogService> = Arc::new(client);

    match &args.command {
        Command::Breeds => {
            for breed in service.breeds().await? {
                println!("{}", breed);
            }
        }
        Command::Search {
            breeds,
            age_min,
            age_max,
            zip_codes,
            desc,
            pages,
            match_shown,
        } => {
            let mut config = config.clone();
            if *desc {
                config.default_sort = SortDirection::Desc;
            }
            let table = ResultTable::new(service.clone(), &config);
            let form = FilterForm {
                breeds: breeds.clone(),
                age_min: age_min.clone(),
                age_max: age_max.clone(),
                zip_codes: zip_codes.clone(),
            };

            check(table.submit_form(&form).await?)?;
            for page in 0..(*pages).max(1) {
                if page > 0 {
                    match table.next_page().await {
                        FetchOutcome::Skipped => break,
                        outcome => check(outcome)?,
                    }
                }
                if *match_shown {
                    table.select_all_visible(true);
                }
                print_page(&table);
            }

            if *match_shown {
                let matched = table.match_favorites().await?;
                match table.match_flow().resolve_match().await? {
                    Some(dog) => println!("Matched: {} the {} ({})", dog.name, dog.breed, dog.id),
                    None => println!("Matched: {}", matched),
                }
            }
        }
        Command::Match { ids } => {
            let selection: SelectionSet = ids.iter().map(|id| DogId::from(id.as_str())).collect();
            let flow = MatchFlow::new(service.clone());
            let matched = flow.request_match(&selection).await?;
            match flow.resolve_match().await? {
                Some(dog) => println!("Matched: {} the {} ({})", dog.name, dog.breed, dog.id),
                None => println!("Matched: {}", matched),
            }
        }
    }

    if let Err(e) = service.logout().await {
        tracing::debug!(error = %e, "Logout failed");
    }
    Ok(())
}
