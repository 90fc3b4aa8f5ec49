use crate::server::{
    render::{
        components::{field_errors, format_date, post_list},
        layout,
    },
    urls,
};
use maud::{Markup, html};
use yatube_common::{
    form::{CommentForm, FormErrors, PostForm},
    model::{
        Id,
        comment::Comment,
        group::Group,
        post::{Post, PostMarker},
        user::User,
    },
    pagination::Page,
};

pub fn index_page(viewer: Option<&User>, page: &Page<Post>) -> Markup {
    let body = html! {
        h1 { "Latest posts" }
        (post_list(page, None, &urls::index()))
    };

    layout("Latest posts", viewer, &body)
}

pub fn group_page(viewer: Option<&User>, group: &Group, page: &Page<Post>) -> Markup {
    let body = html! {
        h1 { (group.title) }
        @if !group.description.is_empty() {
            p { (group.description) }
        }
        (post_list(page, Some(group), &urls::group(&group.slug)))
    };

    layout(&group.title, viewer, &body)
}

/// `following` says whether the viewer follows `author`.
pub fn profile_page(
    viewer: Option<&User>,
    author: &User,
    page: &Page<Post>,
    following: bool,
) -> Markup {
    let is_own_profile = viewer.is_some_and(|viewer| viewer.id == author.id);

    let body = html! {
        div.profile-header {
            h1 { "All posts of " (author.username) }
            span { "Posts: " (page.count) }
        }
        @if viewer.is_some() && !is_own_profile {
            @if following {
                a.unfollow href=(urls::unfollow(&author.username)) { "Unfollow" }
            } @else {
                a.follow href=(urls::follow(&author.username)) { "Follow" }
            }
        }
        (post_list(page, None, &urls::profile(&author.username)))
    };

    layout(&format!("Profile of {}", author.username), viewer, &body)
}

pub fn follow_page(viewer: &User, page: &Page<Post>) -> Markup {
    let body = html! {
        h1 { "Posts of authors you follow" }
        (post_list(page, None, &urls::follow_index()))
    };

    layout("Following", Some(viewer), &body)
}

/// `comment_form` is shown to logged in viewers only.
pub fn post_detail_page(
    viewer: Option<&User>,
    post: &Post,
    author_post_count: u64,
    comments: &[Comment],
    comment_form: &CommentForm,
    errors: &FormErrors,
) -> Markup {
    let can_edit = viewer.is_some_and(|viewer| post.authorize_edit(viewer.id).is_ok());

    let body = html! {
        article.post-detail {
            p.meta {
                "Published " (format_date(post.pub_date))
                @if let Some(group) = &post.group {
                    " in "
                    a href=(urls::group(&group.slug)) { (group.title) }
                }
            }
            p.meta {
                "Author: "
                a href=(urls::profile(&post.author.username)) { (post.author.username) }
                " (posts: " (author_post_count) ")"
            }
            @if let Some(image) = &post.image {
                img src=(urls::media(image)) alt="";
            }
            p.text { (post.text) }
            @if can_edit {
                a href=(urls::post_edit(post.id)) { "Edit post" }
            }
        }
        section.comments {
            h2 { "Comments" }
            @for comment in comments {
                article.comment {
                    p.meta {
                        a href=(urls::profile(&comment.author.username)) { (comment.author.username) }
                        " · " (format_date(comment.created))
                    }
                    p { (comment.text) }
                }
            }
            @if viewer.is_some() {
                form method="post" action=(urls::add_comment(post.id)) {
                    p {
                        label for="id_text" { "Add a comment" }
                        (field_errors(errors, "text"))
                        textarea id="id_text" name="text" required { (comment_form.text) }
                    }
                    button type="submit" { "Send" }
                }
            }
        }
    };

    layout(&post.to_string(), viewer, &body)
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum PostFormTarget {
    Create,
    Edit(Id<PostMarker>),
}

pub fn post_form_page(
    viewer: &User,
    target: PostFormTarget,
    form: &PostForm,
    groups: &[Group],
    errors: &FormErrors,
) -> Markup {
    let (title, action, submit) = match target {
        PostFormTarget::Create => ("New post", urls::create(), "Publish"),
        PostFormTarget::Edit(post) => ("Edit post", urls::post_edit(post), "Save"),
    };

    let body = html! {
        h1 { (title) }
        form method="post" action=(action) enctype="multipart/form-data" {
            p {
                label for="id_text" { "Text" }
                (field_errors(errors, "text"))
                textarea id="id_text" name="text" required { (form.text) }
            }
            p {
                label for="id_group" { "Group" }
                (field_errors(errors, "group"))
                select id="id_group" name="group" {
                    option value="" selected[form.group.is_empty()] { "---------" }
                    @for group in groups {
                        @let value = group.id.to_string();
                        option value=(value) selected[form.group == value] { (group.title) }
                    }
                }
            }
            p {
                label for="id_image" { "Image" }
                (field_errors(errors, "image"))
                input id="id_image" type="file" name="image" accept="image/*";
            }
            button type="submit" { (submit) }
        }
    };

    layout(title, Some(viewer), &body)
}
