use std::sync::Arc;

use arml_client::{
    AdminClient, StoreOf,
    api::ApiError,
    config::{ClientConfig, ConfigError},
    delete::DeleteError,
    http::RestClient,
    navigation::{HistoryNavigator, Navigator},
    update::{SubmitError, UpdateView},
};
use arml_core::{
    Entity, EntityKind, Game, GameScore, Player, Profile,
    route::{Route, RouteAction, RouteError},
};
use log::{error, info};
use thiserror::Error;

mod console;
mod logs;

const USAGE: &str = "Usage: arml-admin <route> [field=value ...] [--sort <field>]... [--yes]";

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}\n{usage}", usage = USAGE)]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Delete(#[from] DeleteError),

    #[error("failed to read confirmation")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    route: String,
    assignments: Vec<(String, String)>,
    sorts: Vec<String>,
    yes: bool,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<CliArgs, CliError> {
        let mut parsed = CliArgs::default();
        let mut route = None;
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if arg == "--yes" || arg == "-y" {
                parsed.yes = true;
                continue;
            }
            if arg == "--sort" {
                let field = args
                    .next()
                    .ok_or_else(|| CliError::Usage("--sort needs a field".to_string()))?;
                parsed.sorts.push(field);
                continue;
            }
            if route.is_none() && arg.starts_with('/') {
                route = Some(arg);
                continue;
            }
            let Some((field, value)) = arg.split_once('=') else {
                return Err(CliError::Usage(format!("unexpected argument {}", arg)));
            };
            parsed
                .assignments
                .push((field.to_string(), value.to_string()));
        }
        parsed.route = route.ok_or_else(|| CliError::Usage("missing route".to_string()))?;
        Ok(parsed)
    }
}

async fn edit<E: Entity>(mut view: UpdateView<E>, args: &CliArgs) -> Result<(), CliError> {
    if let Err(e) = view.mount().await {
        error!("Some options could not be loaded: {}", e);
    }
    for (field, value) in &args.assignments {
        view.set(field, value.as_str());
    }
    match view.submit().await {
        Ok(saved) => {
            info!("Saved {} {:?}", E::KIND, saved.id());
            println!("{}", serde_json::to_string_pretty(&saved).unwrap_or_default());
            Ok(())
        }
        Err(SubmitError::Validation(errors)) => {
            eprint!("{}", console::form_errors(&errors));
            Err(SubmitError::Validation(errors).into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn screen<E: Entity>(client: &AdminClient, route: Route, args: &CliArgs) -> Result<(), CliError>
where
    AdminClient: StoreOf<E>,
{
    match route.action {
        RouteAction::List => {
            let mut view = client.list_view::<E>();
            view.mount().await?;
            for field in &args.sorts {
                view.sort_by(field).await?;
            }
            if view.show_not_found() {
                println!("No {} found", E::KIND);
            } else {
                print!("{}", console::table(&view.columns(), &view.rows()));
            }
        }
        RouteAction::Detail(id) => {
            let view = client.detail_view::<E>(id);
            view.mount().await?;
            print!("{}", console::details(&view.fields()));
        }
        RouteAction::New => edit(client.update_view::<E>(None), args).await?,
        RouteAction::Edit(id) => edit(client.update_view::<E>(Some(id)), args).await?,
        RouteAction::Delete(id) => {
            let mut flow = client.delete_flow::<E>(id);
            flow.mount().await?;
            let detail = client.detail_view::<E>(id);
            print!("{}", console::details(&detail.fields()));
            let stdin = std::io::stdin();
            if args.yes || console::confirm(&flow.prompt(), stdin.lock(), std::io::stdout())? {
                flow.confirm().await?;
            } else {
                flow.cancel();
            }
        }
    }
    Ok(())
}

async fn run(args: CliArgs) -> Result<(), CliError> {
    let route = Route::parse(&args.route)?;
    let config = ClientConfig::from_env()?;
    let backend = RestClient::new(&config)?;
    let navigator = Arc::new(HistoryNavigator::new(args.route.clone()));
    let client = AdminClient::new(backend, navigator.clone());

    info!("Opening {} against {}", route, config.base_url);
    match route.kind {
        EntityKind::Player => screen::<Player>(&client, route, &args).await?,
        EntityKind::Game => screen::<Game>(&client, route, &args).await?,
        EntityKind::GameScore => screen::<GameScore>(&client, route, &args).await?,
        EntityKind::Profile => screen::<Profile>(&client, route, &args).await?,
        EntityKind::User => return Err(RouteError::UnknownEntity(route.kind.to_string()).into()),
    }
    println!("{}", navigator.location());
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(e) = logs::init_logger() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let result = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => run(args).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
