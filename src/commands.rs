use crate::models::OptionFamily;

pub const HELP: &str = "\
Commands:
  categories | countries | languages   list available options
  category <name>                      browse a category
  country <code|name>                  browse a country (empty for all)
  language <code|name>                 browse a language (empty for all)
  search <text>                        keyword search
  clear                                leave search, restore previous filter
  refresh                              fetch the current filter again
  open <n>                             show article n
  close                                close the article
  summarize                            generate an AI summary of the open article
  login <email> <password>             sign in
  logout                               sign out
  whoami                               show the signed-in user
  help                                 show this help
  quit                                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Options(OptionFamily),
    Category(String),
    Country(String),
    Language(String),
    Search(String),
    Clear,
    Refresh,
    Open(usize),
    Close,
    Summarize,
    Login { email: String, password: String },
    Logout,
    WhoAmI,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_lowercase().as_str() {
            "categories" => Command::Options(OptionFamily::Category),
            "countries" => Command::Options(OptionFamily::Country),
            "languages" => Command::Options(OptionFamily::Language),
            "category" => Command::Category(rest.to_string()),
            "country" => Command::Country(rest.to_string()),
            "language" => Command::Language(rest.to_string()),
            "search" | "/" => Command::Search(rest.to_string()),
            "clear" => Command::Clear,
            "refresh" => Command::Refresh,
            "open" => {
                let n: usize = rest
                    .parse()
                    .map_err(|_| format!("`open` needs an article number, got `{rest}`"))?;
                if n == 0 {
                    return Err("articles are numbered from 1".to_string());
                }
                Command::Open(n)
            }
            "close" => Command::Close,
            "summarize" | "summary" => Command::Summarize,
            "login" => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some(email), Some(password)) => Command::Login {
                        email: email.to_string(),
                        password: password.to_string(),
                    },
                    _ => return Err("usage: login <email> <password>".to_string()),
                }
            }
            "logout" => Command::Logout,
            "whoami" => Command::WhoAmI,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "" => return Err(String::new()),
            other => return Err(format!("unknown command `{other}`, type `help`")),
        };
        Ok(command)
    }
}
