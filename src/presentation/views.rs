use crate::{
    application::{
        error::{ErrorReport, HttpError},
        feed::{FeedPage, FeedSubject},
        pagination::Page,
        posts::PostDetail,
    },
    domain::{
        access::{Access, Viewer, can_edit_post},
        entities::{AuthorRef, CommentRecord, GroupRecord, PostListItem},
        posts::{display_time, title_preview},
    },
};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

const BRAND_TITLE: &str = "Lectern";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

/// Navigation state for the signed-in viewer.
#[derive(Clone)]
pub struct ViewerNav {
    pub username: String,
    pub profile_href: String,
}

/// Everything the base layout needs besides the page content.
#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub viewer: Option<ViewerNav>,
    /// Login link returning to the current page.
    pub login_href: String,
}

impl LayoutChrome {
    pub fn new(viewer: Option<&Viewer>, path: &str) -> Self {
        Self {
            brand: BrandView {
                title: BRAND_TITLE.to_string(),
                href: "/".to_string(),
            },
            viewer: viewer.map(|viewer| ViewerNav {
                username: viewer.username.clone(),
                profile_href: profile_href(&viewer.username),
            }),
            login_href: login_href(path),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub viewer: Option<ViewerNav>,
    pub login_href: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            viewer: chrome.viewer,
            login_href: chrome.login_href,
            content,
        }
    }
}

#[derive(Clone)]
pub struct GroupLinkView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PostCardView {
    pub id: i64,
    pub detail_href: String,
    pub text: String,
    pub image_url: Option<String>,
    pub author_name: String,
    pub author_href: String,
    pub group: Option<GroupLinkView>,
    pub published: String,
    pub edit_href: Option<String>,
}

impl PostCardView {
    pub fn from_item(item: &PostListItem, viewer: Option<&Viewer>) -> Self {
        let edit_href = (can_edit_post(viewer, item.author.id) == Access::Allowed)
            .then(|| format!("/posts/{}/edit/", item.id));

        Self {
            id: item.id,
            detail_href: post_href(item.id),
            text: item.text.clone(),
            image_url: item.image_path.as_deref().map(media_url),
            author_name: author_display_name(&item.author),
            author_href: profile_href(&item.author.username),
            group: item.group.as_ref().map(|group| GroupLinkView {
                title: group.title.clone(),
                href: group_href(&group.slug),
            }),
            published: display_time(item.created_at),
            edit_href,
        }
    }
}

#[derive(Clone)]
pub struct PageLinkView {
    pub number: u64,
    pub href: String,
    pub is_current: bool,
}

#[derive(Clone)]
pub struct PaginatorView {
    pub number: u64,
    pub total_pages: u64,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
    pub pages: Vec<PageLinkView>,
}

impl PaginatorView {
    /// Links for a multi-page listing. Single-page listings get no paginator.
    pub fn build<T>(page: &Page<T>, base_path: &str) -> Option<Self> {
        if page.total_pages <= 1 {
            return None;
        }

        let href = |number: u64| format!("{base_path}?page={number}");
        Some(Self {
            number: page.number,
            total_pages: page.total_pages,
            previous_href: page.has_previous().then(|| href(page.previous_number())),
            next_href: page.has_next().then(|| href(page.next_number())),
            pages: (1..=page.total_pages)
                .map(|number| PageLinkView {
                    number,
                    href: href(number),
                    is_current: number == page.number,
                })
                .collect(),
        })
    }
}

/// Header of a profile feed.
#[derive(Clone)]
pub struct ProfileHeaderView {
    pub display_name: String,
    pub username: String,
    pub post_count: u64,
    pub followers: u64,
    pub follows: u64,
    pub following: bool,
    /// Follow buttons are only offered to signed-in viewers on someone else's profile.
    pub show_follow_controls: bool,
    pub follow_href: String,
    pub unfollow_href: String,
}

#[derive(Clone)]
pub struct FeedView {
    pub heading: String,
    pub description: Option<String>,
    pub profile: Option<ProfileHeaderView>,
    pub posts: Vec<PostCardView>,
    pub paginator: Option<PaginatorView>,
    pub empty_message: String,
}

impl FeedView {
    pub fn from_feed(feed: &FeedPage, viewer: Option<&Viewer>, base_path: &str) -> Self {
        let posts = feed
            .page
            .items
            .iter()
            .map(|item| PostCardView::from_item(item, viewer))
            .collect();
        let paginator = PaginatorView::build(&feed.page, base_path);

        let (heading, description, profile, empty_message) = match &feed.subject {
            FeedSubject::Global => (
                "Latest posts".to_string(),
                None,
                None,
                "Nobody has posted yet.".to_string(),
            ),
            FeedSubject::Group(group) => (
                group.title.clone(),
                Some(group.description.clone()).filter(|text| !text.trim().is_empty()),
                None,
                "This group has no posts yet.".to_string(),
            ),
            FeedSubject::Profile(summary) => {
                let display_name = summary.author.display_name().to_string();
                let username = summary.author.username.clone();
                let header = ProfileHeaderView {
                    display_name: display_name.clone(),
                    post_count: feed.page.total_items,
                    followers: summary.followers,
                    follows: summary.follows,
                    following: summary.following,
                    show_follow_controls: viewer.is_some() && !summary.is_self,
                    follow_href: format!("{}follow/", profile_href(&username)),
                    unfollow_href: format!("{}unfollow/", profile_href(&username)),
                    username,
                };
                (
                    display_name,
                    None,
                    Some(header),
                    "No posts yet.".to_string(),
                )
            }
            FeedSubject::Following => (
                "Authors you follow".to_string(),
                None,
                None,
                "Follow some authors to see their posts here.".to_string(),
            ),
        };

        Self {
            heading,
            description,
            profile,
            posts,
            paginator,
            empty_message,
        }
    }

    pub fn title(&self) -> &str {
        &self.heading
    }
}

#[derive(Template)]
#[template(path = "feed.html")]
pub struct FeedTemplate {
    pub view: LayoutContext<FeedView>,
}

#[derive(Clone)]
pub struct CommentView {
    pub author_name: String,
    pub author_href: String,
    pub text: String,
    pub published: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author_name: author_display_name(&comment.author),
            author_href: profile_href(&comment.author.username),
            text: comment.text.clone(),
            published: display_time(comment.created_at),
        }
    }
}

pub struct PostDetailView {
    pub title: String,
    pub post: PostCardView,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    /// Form target for signed-in viewers.
    pub comment_action: Option<String>,
    pub login_href: String,
}

impl PostDetailView {
    pub fn from_detail(detail: &PostDetail, viewer: Option<&Viewer>) -> Self {
        let post = PostCardView::from_item(&detail.post, viewer);
        let comment_action = viewer.map(|_| format!("/posts/{}/comment/", detail.post.id));
        let login_href = login_href(&post.detail_href);

        Self {
            title: title_preview(&detail.post.text),
            post,
            author_post_count: detail.author_post_count,
            comments: detail.comments.iter().map(CommentView::from).collect(),
            comment_action,
            login_href,
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Clone)]
pub struct GroupOptionView {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOptionView>,
    pub current_image: Option<String>,
    pub text_error: Option<String>,
    pub group_error: Option<String>,
    pub image_error: Option<String>,
}

impl PostFormView {
    pub fn new(
        action: impl Into<String>,
        is_edit: bool,
        text: impl Into<String>,
        groups: &[GroupRecord],
        selected_group: Option<i64>,
    ) -> Self {
        Self {
            is_edit,
            action: action.into(),
            text: text.into(),
            groups: groups
                .iter()
                .map(|group| GroupOptionView {
                    id: group.id,
                    title: group.title.clone(),
                    selected: Some(group.id) == selected_group,
                })
                .collect(),
            current_image: None,
            text_error: None,
            group_error: None,
            image_error: None,
        }
    }

    pub fn with_current_image(self, image_path: Option<&str>) -> Self {
        Self {
            current_image: image_path.map(media_url),
            ..self
        }
    }

    pub fn has_errors(&self) -> bool {
        self.text_error.is_some() || self.group_error.is_some() || self.image_error.is_some()
    }
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct LoginView {
    pub next: String,
    pub username: String,
    pub error: Option<String>,
    pub signup_href: String,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

pub struct SignupView {
    pub username: String,
    pub full_name: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to the latest posts".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn post_href(id: i64) -> String {
    format!("/posts/{id}/")
}

pub fn profile_href(username: &str) -> String {
    format!("/profile/{}/", encode_path_segment(username))
}

pub fn group_href(slug: &str) -> String {
    format!("/group/{}/", encode_path_segment(slug))
}

pub fn media_url(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

/// Login page URL that returns to `next` afterwards.
pub fn login_href(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/auth/login/?next={}", encoded.replace("%2F", "/"))
}

fn author_display_name(author: &AuthorRef) -> String {
    let trimmed = author.full_name.trim();
    if trimmed.is_empty() {
        author.username.clone()
    } else {
        trimmed.to_string()
    }
}

fn encode_path_segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::entities::GroupRef;

    fn item(author_id: i64) -> PostListItem {
        PostListItem {
            id: 7,
            text: "hello".to_string(),
            image_path: Some("posts/abc-cat.png".to_string()),
            author: AuthorRef {
                id: author_id,
                username: "leo".to_string(),
                full_name: "Leo Tolstoy".to_string(),
            },
            group: Some(GroupRef {
                id: 1,
                slug: "novels".to_string(),
                title: "Novels".to_string(),
            }),
            created_at: datetime!(2024-03-01 12:30 UTC),
        }
    }

    fn viewer(user_id: i64) -> Viewer {
        Viewer {
            user_id,
            username: "someone".to_string(),
        }
    }

    #[test]
    fn login_href_keeps_path_readable() {
        assert_eq!(
            login_href("/posts/5/comment/"),
            "/auth/login/?next=/posts/5/comment/"
        );
        assert_eq!(login_href("/?page=2"), "/auth/login/?next=/%3Fpage%3D2");
    }

    #[test]
    fn post_card_offers_edit_only_to_author() {
        let card = PostCardView::from_item(&item(3), Some(&viewer(3)));
        assert_eq!(card.edit_href.as_deref(), Some("/posts/7/edit/"));
        assert_eq!(card.image_url.as_deref(), Some("/media/posts/abc-cat.png"));
        assert_eq!(card.author_href, "/profile/leo/");
        assert_eq!(card.author_name, "Leo Tolstoy");

        let card = PostCardView::from_item(&item(3), Some(&viewer(4)));
        assert!(card.edit_href.is_none());
        let card = PostCardView::from_item(&item(3), None);
        assert!(card.edit_href.is_none());
    }

    #[test]
    fn paginator_is_omitted_for_single_page() {
        let page: Page<()> = Page {
            items: Vec::new(),
            number: 1,
            total_pages: 1,
            total_items: 3,
        };
        assert!(PaginatorView::build(&page, "/").is_none());
    }

    #[test]
    fn paginator_links_neighbours() {
        let page: Page<()> = Page {
            items: Vec::new(),
            number: 2,
            total_pages: 3,
            total_items: 25,
        };
        let paginator = PaginatorView::build(&page, "/group/novels/").expect("paginator");
        assert_eq!(
            paginator.previous_href.as_deref(),
            Some("/group/novels/?page=1")
        );
        assert_eq!(
            paginator.next_href.as_deref(),
            Some("/group/novels/?page=3")
        );
        assert_eq!(paginator.pages.len(), 3);
        assert!(paginator.pages[1].is_current);
    }
}
