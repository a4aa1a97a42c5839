use link_manager::*;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let args = std::env::args().collect::<Vec<_>>();

    match &args[..] {
        [_, db, name, email, password] => {
            let res = async {
                let db = database::Db::new(db)?;
                account::register(&db, name, email, password).await
            }
            .await;

            match res {
                Ok(id) => println!("{}", id),
                Err(err) => {
                    eprintln!("{}", err);
                    std::process::exit(1);
                },
            }
        },
        _ => {
            eprintln!("usage: ./add-user db name email password");
            std::process::exit(1);
        },
    }
}
