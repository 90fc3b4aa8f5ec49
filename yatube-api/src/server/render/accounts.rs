use crate::server::{
    render::{components::field_errors, layout},
    urls,
};
use maud::{Markup, html};
use yatube_common::form::{FormErrors, NON_FIELD_ERRORS};

pub fn login_page(username: &str, next: Option<&str>, errors: &FormErrors) -> Markup {
    let body = html! {
        h1 { "Log in" }
        (field_errors(errors, NON_FIELD_ERRORS))
        form method="post" action=(urls::login(None)) {
            @if let Some(next) = next {
                input type="hidden" name="next" value=(next);
            }
            p {
                label for="id_username" { "Username" }
                (field_errors(errors, "username"))
                input id="id_username" type="text" name="username" value=(username) required;
            }
            p {
                label for="id_password" { "Password" }
                (field_errors(errors, "password"))
                input id="id_password" type="password" name="password" required;
            }
            button type="submit" { "Log in" }
        }
        p { "No account yet? " a href=(urls::signup()) { "Sign up" } }
    };

    layout("Log in", None, &body)
}

pub fn signup_page(username: &str, errors: &FormErrors) -> Markup {
    let body = html! {
        h1 { "Sign up" }
        form method="post" action=(urls::signup()) {
            p {
                label for="id_username" { "Username" }
                (field_errors(errors, "username"))
                input id="id_username" type="text" name="username" value=(username) required;
            }
            p {
                label for="id_password1" { "Password" }
                (field_errors(errors, "password1"))
                input id="id_password1" type="password" name="password1" required;
            }
            p {
                label for="id_password2" { "Password confirmation" }
                (field_errors(errors, "password2"))
                input id="id_password2" type="password" name="password2" required;
            }
            button type="submit" { "Sign up" }
        }
    };

    layout("Sign up", None, &body)
}

pub fn logged_out_page() -> Markup {
    let body = html! {
        h1 { "You have been logged out" }
        p { a href=(urls::login(None)) { "Log in again" } }
    };

    layout("Logged out", None, &body)
}
