use crate::server::urls;
use maud::{Markup, html};
use time::UtcDateTime;
use yatube_common::{
    form::FormErrors,
    model::{group::Group, post::Post},
    pagination::Page,
};

/// `19 October 2026`
pub fn format_date(date: UtcDateTime) -> String {
    format!("{} {} {}", date.day(), date.month(), date.year())
}

/// A post as it appears in listings.
///
/// The group link is left out on the group's own page.
pub fn post_card(post: &Post, current_group: Option<&Group>) -> Markup {
    html! {
        article.post {
            p.meta {
                "Author: "
                a href=(urls::profile(&post.author.username)) { (post.author.username) }
                " · "
                time datetime=(post.pub_date.unix_timestamp()) { (format_date(post.pub_date)) }
            }
            @if let Some(image) = &post.image {
                img src=(urls::media(image)) alt="";
            }
            p.text { (post.text) }
            p.meta {
                a href=(urls::post_detail(post.id)) { "Details" }
                @if let Some(group) = linked_group(post, current_group) {
                    " · "
                    a href=(urls::group(&group.slug)) { "All posts of " (group.title) }
                }
            }
        }
    }
}

fn linked_group<'a>(post: &'a Post, current_group: Option<&Group>) -> Option<&'a Group> {
    post.group
        .as_ref()
        .filter(|group| current_group.is_none_or(|current| current.id != group.id))
}

pub fn post_list(page: &Page<Post>, current_group: Option<&Group>, path: &str) -> Markup {
    html! {
        @for post in page {
            (post_card(post, current_group))
        }
        @if page.is_empty() {
            p { "No posts yet." }
        }
        (paginator(page, path))
    }
}

/// Page links below a listing. Nothing for a single page.
pub fn paginator<T>(page: &Page<T>, path: &str) -> Markup {
    html! {
        @if page.num_pages > 1 {
            nav aria-label="Pages" {
                ul.pagination {
                    @if let Some(previous) = page.previous_page_number() {
                        li { a href=(urls::page(path, 1)) { "« first" } }
                        li { a href=(urls::page(path, previous)) { "previous" } }
                    }
                    li.current { "Page " (page.number) " of " (page.num_pages) }
                    @if let Some(next) = page.next_page_number() {
                        li { a href=(urls::page(path, next)) { "next" } }
                        li { a href=(urls::page(path, page.num_pages)) { "last »" } }
                    }
                }
            }
        }
    }
}

pub fn field_errors(errors: &FormErrors, field: &str) -> Markup {
    let messages = errors.field(field);
    html! {
        @if !messages.is_empty() {
            ul.errorlist {
                @for message in messages {
                    li { (message) }
                }
            }
        }
    }
}
