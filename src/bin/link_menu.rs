use std::io;

use link_manager::menu::Menu;

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let args = std::env::args().collect::<Vec<_>>();

    let path = match &args[..] {
        [_] => "link_manager.db",
        [_, path] => path.as_str(),
        _ => {
            eprintln!("usage: ./link-menu [db]");
            std::process::exit(1);
        },
    };

    let res = rusqlite::Connection::open(path)
        .map_err(link_manager::Error::from)
        .and_then(|conn| {
            let mut menu = Menu::new(&conn, io::stdin().lock(), io::stdout().lock())?;
            menu.run()
        });

    if let Err(err) = res {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
