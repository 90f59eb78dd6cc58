//! Application routes and the sign-in guard.

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Home,
    Trending,
    Search(String),
    Watch(String),
    Shorts,
    Channel(String),
    Library,
    History,
    Liked,
    WatchLater,
    Subscriptions,
}

impl Route {
    /// Maps a path such as `/watch/abc` or `/results?search_query=rust` to a
    /// route. Anything unrecognized lands on `Home`.
    pub fn parse(path: &str) -> Route {
        let Ok(url) = Url::parse("tube://app").and_then(|base| base.join(path.trim())) else {
            return Route::Home;
        };
        let segments: Vec<&str> = url
            .path_segments()
            .map(|parts| parts.filter(|part| !part.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["trending"] => Route::Trending,
            ["results"] => {
                let query = url
                    .query_pairs()
                    .find(|(key, _)| key == "search_query")
                    .map(|(_, value)| value.trim().to_string())
                    .unwrap_or_default();
                if query.is_empty() {
                    Route::Home
                } else {
                    Route::Search(query)
                }
            }
            ["watch", id] => Route::Watch(decode(id)),
            ["shorts"] => Route::Shorts,
            ["channel", id] => Route::Channel(decode(id)),
            ["library"] => Route::Library,
            ["history"] => Route::History,
            ["liked"] => Route::Liked,
            ["watch-later"] => Route::WatchLater,
            ["subscriptions"] => Route::Subscriptions,
            _ => Route::Home,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Home => "/".to_string(),
            Route::Trending => "/trending".to_string(),
            Route::Search(query) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("search_query", query)
                    .finish();
                format!("/results?{encoded}")
            }
            Route::Watch(id) => format!("/watch/{id}"),
            Route::Shorts => "/shorts".to_string(),
            Route::Channel(id) => format!("/channel/{id}"),
            Route::Library => "/library".to_string(),
            Route::History => "/history".to_string(),
            Route::Liked => "/liked".to_string(),
            Route::WatchLater => "/watch-later".to_string(),
            Route::Subscriptions => "/subscriptions".to_string(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            Route::Login => "Sign in".to_string(),
            Route::Home => "Home".to_string(),
            Route::Trending => "Trending".to_string(),
            Route::Search(query) => format!("Results for \"{query}\""),
            Route::Watch(_) => "Watch".to_string(),
            Route::Shorts => "Shorts".to_string(),
            Route::Channel(_) => "Channel".to_string(),
            Route::Library => "Library".to_string(),
            Route::History => "History".to_string(),
            Route::Liked => "Liked videos".to_string(),
            Route::WatchLater => "Watch later".to_string(),
            Route::Subscriptions => "Subscriptions".to_string(),
        }
    }
}

/// Resolves where a navigation actually ends up given the sign-in state.
pub fn guard(route: Route, authenticated: bool) -> Route {
    match (route, authenticated) {
        (Route::Login, true) => Route::Home,
        (Route::Login, false) => Route::Login,
        (_, false) => Route::Login,
        (route, true) => route,
    }
}

fn decode(segment: &str) -> String {
    url::form_urlencoded::parse(format!("v={segment}").as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_paths() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/login"), Route::Login);
        assert_eq!(Route::parse("/trending"), Route::Trending);
        assert_eq!(Route::parse("/watch/dQw4w9WgXcQ"), Route::Watch("dQw4w9WgXcQ".into()));
        assert_eq!(Route::parse("/channel/UC42"), Route::Channel("UC42".into()));
        assert_eq!(Route::parse("/shorts"), Route::Shorts);
        assert_eq!(Route::parse("/watch-later"), Route::WatchLater);
        assert_eq!(Route::parse("/subscriptions/"), Route::Subscriptions);
    }

    #[test]
    fn parses_search_query() {
        assert_eq!(
            Route::parse("/results?search_query=lofi+beats"),
            Route::Search("lofi beats".into())
        );
        assert_eq!(
            Route::parse("/results?search_query=a%26b"),
            Route::Search("a&b".into())
        );
        assert_eq!(Route::parse("/results"), Route::Home);
    }

    #[test]
    fn unknown_paths_go_home() {
        assert_eq!(Route::parse("/nope"), Route::Home);
        assert_eq!(Route::parse("/watch"), Route::Home);
        assert_eq!(Route::parse("/watch/a/b"), Route::Home);
    }

    #[test]
    fn paths_parse_back() {
        for route in [
            Route::Home,
            Route::Login,
            Route::Search("rust & tui".into()),
            Route::Watch("abc".into()),
            Route::Channel("UCx".into()),
            Route::Liked,
        ] {
            assert_eq!(Route::parse(&route.path()), route);
        }
    }

    #[test]
    fn guard_redirects_signed_out_users_to_login() {
        assert_eq!(guard(Route::Trending, false), Route::Login);
        assert_eq!(guard(Route::Watch("x".into()), false), Route::Login);
        assert_eq!(guard(Route::Login, false), Route::Login);
    }

    #[test]
    fn guard_sends_signed_in_users_away_from_login() {
        assert_eq!(guard(Route::Login, true), Route::Home);
        assert_eq!(guard(Route::Shorts, true), Route::Shorts);
    }
}
