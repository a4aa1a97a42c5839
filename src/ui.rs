use handlebars::Handlebars;
use serde::Serialize;

use super::*;

/// Pages show at most this many links as "recent" on the dashboard
/// counter, and this many in the recent list below it.
pub const RECENT_COUNT : usize = 7;
pub const RECENT_SHOWN : usize = 5;

#[derive(Debug, Serialize)]
pub struct Message {
    kind : &'static str,
    text : String,
}

impl Message {
    pub fn success<S : Into<String>>(text : S) -> Self {
        Message {
            kind : "success",
            text : text.into(),
        }
    }

    pub fn error<S : Into<String>>(text : S) -> Self {
        Message {
            kind : "error",
            text : text.into(),
        }
    }
}

impl From<&Error> for Message {
    fn from(err : &Error) -> Self {
        Message::error(err.user_message())
    }
}

#[derive(Serialize)]
struct LinkView<'a> {
    id :          u32,
    name :        &'a str,
    url :         &'a str,
    /// Only set for http(s) addresses, so rows written outside the web
    /// forms never become live `javascript:` links.
    href :        Option<&'a str>,
    description : Option<&'a str>,
    added :       String,
    selected :    bool,
}

impl<'a> LinkView<'a> {
    fn new(link : &'a models::Link, selected : bool) -> Self {
        LinkView {
            id : link.id,
            name : &link.name,
            url : &link.url,
            href : Some(link.url.as_str()).filter(|u| linkable(u)),
            description : link.description.as_deref(),
            added : link.added(),
            selected,
        }
    }

    fn all(links : &'a [models::Link]) -> Vec<Self> {
        links.iter().map(|l| LinkView::new(l, false)).collect()
    }
}

fn linkable(url : &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    url.starts_with("http://") || url.starts_with("https://")
}

pub struct Renderer(Handlebars<'static>);

impl Renderer {
    pub fn new() -> Result<Self> {
        let mut t = Handlebars::new();
        t.set_strict_mode(true);

        macro_rules! register {
            (partials: $(($pname:literal, $ppath:literal))*
             pages: $(($name:literal, $path:literal))*) => {
                $(
                    t.register_partial($pname, include_str!($ppath))?;
                )*
                $(
                    t.register_template_string($name, include_str!($path))?;
                )*
            };
        }

        register! {
            partials:
            ("header", "../ui/header.html")
            ("footer", "../ui/footer.html")
            ("nav", "../ui/nav.html")
            ("message", "../ui/message.html")
            pages:
            ("login", "../ui/login.html")
            ("register", "../ui/register.html")
            ("dashboard", "../ui/dashboard.html")
            ("add-link", "../ui/add-link.html")
            ("search", "../ui/search.html")
            ("manage", "../ui/manage.html")
        }

        Ok(Self(t))
    }

    pub fn login(
        &self,
        email : &str,
        message : Option<Message>,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct Ctx<'a> {
            title :   &'static str,
            email :   &'a str,
            message : Option<Message>,
        }

        Ok(self.0.render("login", &Ctx {
            title : "Login",
            email,
            message,
        })?)
    }

    pub fn register(
        &self,
        name : &str,
        email : &str,
        message : Option<Message>,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct Ctx<'a> {
            title :   &'static str,
            name :    &'a str,
            email :   &'a str,
            message : Option<Message>,
        }

        Ok(self.0.render("register", &Ctx {
            title : "Register",
            name,
            email,
            message,
        })?)
    }

    /// `links` is expected newest first. "Recent" is the first
    /// `RECENT_COUNT` links that carry a creation time, not a time window.
    pub fn dashboard(
        &self,
        user : &models::User,
        links : &[models::Link],
    ) -> Result<String> {
        #[derive(Serialize)]
        struct Ctx<'a> {
            title :  &'static str,
            user :   &'a models::User,
            total :  usize,
            recent : usize,
            links :  Vec<LinkView<'a>>,
        }

        let recent = links
            .iter()
            .filter(|l| l.created_at.is_some())
            .take(RECENT_COUNT)
            .count();

        let shown = &links[..links.len().min(RECENT_SHOWN)];

        Ok(self.0.render("dashboard", &Ctx {
            title : "Dashboard",
            user,
            total : links.len(),
            recent,
            links : LinkView::all(shown),
        })?)
    }

    pub fn add_link(
        &self,
        user : &models::User,
        message : Option<Message>,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct Ctx<'a> {
            title :   &'static str,
            user :    &'a models::User,
            message : Option<Message>,
        }

        Ok(self.0.render("add-link", &Ctx {
            title : "Add Link",
            user,
            message,
        })?)
    }

    /// `results` is `None` when no search was run.
    pub fn search(
        &self,
        user : &models::User,
        query : &str,
        results : Option<&[models::Link]>,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct Ctx<'a> {
            title :    &'static str,
            user :     &'a models::User,
            query :    &'a str,
            searched : bool,
            count :    usize,
            results :  Vec<LinkView<'a>>,
        }

        let results = results.unwrap_or_default();

        Ok(self.0.render("search", &Ctx {
            title : "Search Links",
            user,
            query,
            searched : !query.is_empty(),
            count : results.len(),
            results : LinkView::all(results),
        })?)
    }

    /// Falls back to the newest link when `selected` names none of
    /// `links`.
    pub fn manage(
        &self,
        user : &models::User,
        links : &[models::Link],
        selected : Option<u32>,
        message : Option<Message>,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct Ctx<'a> {
            title :    &'static str,
            user :     &'a models::User,
            links :    Vec<LinkView<'a>>,
            selected : Option<LinkView<'a>>,
            message :  Option<Message>,
        }

        let current = selected
            .and_then(|id| links.iter().find(|l| l.id == id))
            .or_else(|| links.first());

        let views = links
            .iter()
            .map(|l| LinkView::new(l, current.map(|c| c.id) == Some(l.id)))
            .collect();

        Ok(self.0.render("manage", &Ctx {
            title : "Manage Links",
            user,
            links : views,
            selected : current.map(|l| LinkView::new(l, true)),
            message,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> models::User {
        models::User {
            id :            1,
            name :          "Ada".to_string(),
            email :         "ada@example.com".to_string(),
            password_hash : "x".to_string(),
            created_at :    models::Time::parse("2024-01-01 00:00:00").unwrap(),
        }
    }

    fn link(id : u32, created : bool) -> models::Link {
        models::Link {
            id,
            user_id : Some(1),
            name : format!("link {}", id),
            url : format!("https://example.com/{}", id),
            description : None,
            created_at : if created {
                Some(models::Time::parse("2024-02-03 10:00:00").unwrap())
            } else {
                None
            },
        }
    }

    #[test]
    fn templates_compile() {
        Renderer::new().unwrap();
    }

    #[test]
    fn dashboard_counts_recent_with_timestamps_only() {
        let r = Renderer::new().unwrap();
        let mut links : Vec<_> = (1..=10).rev().map(|i| link(i, true)).collect();
        links[0].created_at = None;

        let html = r.dashboard(&user(), &links).unwrap();

        assert!(html.contains("<h3>10</h3><p>Total Links</p>"));
        assert!(html.contains("<h3>7</h3><p>Recent Links</p>"));
        assert!(html.contains("link 10"));
        assert!(html.contains("link 6"));
        assert!(!html.contains("link 5<"));
        assert!(html.contains("Added: Unknown"));
        assert!(html.contains("Added: 2024-02-03"));
    }

    #[test]
    fn output_is_escaped() {
        let r = Renderer::new().unwrap();
        let mut l = link(1, true);
        l.name = "<script>".to_string();

        let html = r.dashboard(&user(), &[l]).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn only_web_addresses_are_links() {
        let r = Renderer::new().unwrap();
        let mut bad = link(2, true);
        bad.url = "javascript:alert(1)".to_string();
        let links = vec![bad, link(1, true)];

        let html = r.dashboard(&user(), &links).unwrap();
        assert!(!html.contains(r#"href="javascript"#));
        assert!(html.contains("javascript:alert(1)"));
        assert!(html.contains(r#"<a href="https://example.com/1">"#));

        let html = r.manage(&user(), &links, None, None).unwrap();
        assert!(!html.contains(r#"href="javascript"#));

        let html = r.search(&user(), "link", Some(&links[..])).unwrap();
        assert!(!html.contains(r#"href="javascript"#));
        assert!(html.contains(r#"<a href="https://example.com/1">Open Link</a>"#));
    }

    #[test]
    fn manage_selects_requested_link() {
        let r = Renderer::new().unwrap();
        let links = vec![link(3, true), link(2, true)];

        let html = r.manage(&user(), &links, Some(2), None).unwrap();
        assert!(html.contains(r#"<option value="2" selected>"#));
        assert!(html.contains(r#"name="link_id" value="2""#));

        let html = r.manage(&user(), &links, Some(99), None).unwrap();
        assert!(html.contains(r#"name="link_id" value="3""#));

        let html = r.manage(&user(), &[], None, None).unwrap();
        assert!(html.contains("No links to manage"));
    }

    #[test]
    fn search_without_query_shows_no_results_block() {
        let r = Renderer::new().unwrap();
        let html = r.search(&user(), "", None).unwrap();
        assert!(!html.contains("Search Results"));

        let html = r.search(&user(), "zzz", Some(&[][..])).unwrap();
        assert!(html.contains("Search Results (0 found)"));
        assert!(html.contains("No links found matching your search."));
    }

    #[test]
    fn messages_render() {
        let r = Renderer::new().unwrap();
        let html = r
            .login("ada@example.com", Some(Message::from(&Error::FailedLogin)))
            .unwrap();
        assert!(html.contains("Invalid email or password!"));
        assert!(html.contains(r#"value="ada@example.com""#));
    }
}
