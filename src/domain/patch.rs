//! Pure page transforms applied after a mutation succeeds.
//!
//! Each function returns the patched page, or `None` when the target post is not on the
//! page. Only the targeted post changes; every other post keeps its value and position.

use netfeed_api_types::{EditPostResponse, LikeResponse, Post, PostId, PostPage};

fn update_post<F>(page: &PostPage, id: PostId, update: F) -> Option<PostPage>
where
    F: FnOnce(&mut Post),
{
    let index = page.position(id)?;
    let mut patched = page.clone();
    update(&mut patched.posts[index]);
    Some(patched)
}

/// Adds a freshly created post to the end of the page. A post whose id is already present is
/// replaced in place instead, so ids stay unique.
pub fn append_post(page: &PostPage, post: Post) -> PostPage {
    let mut patched = page.clone();
    match patched.position(post.id) {
        Some(index) => patched.posts[index] = post,
        None => patched.posts.push(post),
    }
    patched
}

pub fn apply_edit(page: &PostPage, edit: &EditPostResponse) -> Option<PostPage> {
    update_post(page, edit.id, |post| {
        post.text.clone_from(&edit.text);
        post.edited = true;
        post.last_modified = edit.last_modified;
    })
}

/// Copies the server's like count and flag; the count is never adjusted locally.
pub fn apply_like(page: &PostPage, id: PostId, like: LikeResponse) -> Option<PostPage> {
    update_post(page, id, |post| {
        post.likes = like.likes;
        post.liked_by_user = like.liked_by_user;
    })
}

pub fn apply_follow(page: &PostPage, id: PostId, is_following: bool) -> Option<PostPage> {
    update_post(page, id, |post| post.is_following = is_following)
}

/// Sets the page-level follow flag shown on a profile page.
pub fn apply_profile_follow(page: &PostPage, is_following: bool) -> PostPage {
    let mut patched = page.clone();
    patched.is_following = Some(is_following);
    patched
}

/// Swaps the post at `id` for the server's full copy (used after commenting, where the
/// response already carries the updated comment tree).
pub fn replace_post(page: &PostPage, id: PostId, post: Post) -> Option<PostPage> {
    update_post(page, id, |slot| *slot = post)
}
