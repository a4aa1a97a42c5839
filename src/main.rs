use std::sync::Arc;
use std::time::Duration;

use log::{error, info};

use link_manager::config::Config;
use link_manager::{api, database, ui, Result};

const DAY : Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let args = std::env::args().collect::<Vec<_>>();

    let path = match &args[..] {
        [_] => None,
        [_, path] => Some(path.as_str()),
        _ => {
            eprintln!("usage: ./link-manager [config.toml]");
            std::process::exit(1);
        },
    };

    if let Err(err) = run(path).await {
        error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(config_path : Option<&str>) -> Result<()> {
    let conf = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let db = database::Db::new(&conf.database)?;
    info!("opened {}", conf.database.display());

    if let Some(owner) = conf.legacy_owner {
        db.get_user(owner).await?;
        let n = db.assign_unowned_links(owner).await?;
        if n > 0 {
            info!("assigned {} unowned links to user {}", n, owner);
        }
    }

    let server = Arc::new(api::ServerInner {
        server_name :      conf.server_name.clone(),
        token_secret :     conf.token_secret(),
        session_lifetime : DAY * conf.session_days,
        db,
        render :           ui::Renderer::new()?,
    });

    info!("listening on {}", conf.listen);
    warp::serve(api::routes(&server)).run(conf.listen).await;

    Ok(())
}
