//! Comment tree traversal.
//!
//! Trees are walked depth-first with an explicit stack, so arbitrarily deep reply chains
//! never grow the call stack.

use std::collections::HashSet;

use netfeed_api_types::{Comment, CommentId};

use super::error::DomainError;

/// Pre-order, depth-first iterator over a comment forest. Yields `(depth, comment)` with
/// top-level comments at depth 0, in document order.
pub struct Walk<'a> {
    stack: Vec<(usize, &'a Comment)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Comment);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, comment) = self.stack.pop()?;
        self.stack
            .extend(comment.replies.iter().rev().map(|reply| (depth + 1, reply)));
        Some((depth, comment))
    }
}

pub fn walk(comments: &[Comment]) -> Walk<'_> {
    Walk {
        stack: comments.iter().rev().map(|comment| (0, comment)).collect(),
    }
}

pub fn find_comment(comments: &[Comment], id: CommentId) -> Option<&Comment> {
    walk(comments)
        .map(|(_, comment)| comment)
        .find(|comment| comment.id == id)
}

/// Number of comments in the forest, replies included.
pub fn count(comments: &[Comment]) -> usize {
    walk(comments).count()
}

/// Length of the longest reply chain; zero for an empty forest.
pub fn depth(comments: &[Comment]) -> usize {
    walk(comments)
        .map(|(depth, _)| depth + 1)
        .max()
        .unwrap_or(0)
}

/// Checks that every comment id appears once. Owned trees cannot form cycles, so a repeated
/// id is the only way a comment could claim to be its own ancestor.
pub fn validate_tree(comments: &[Comment]) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for (_, comment) in walk(comments) {
        if !seen.insert(comment.id) {
            return Err(DomainError::invariant(format!(
                "comment {} appears more than once in the tree",
                comment.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn comment(id: u64, replies: Vec<Comment>) -> Comment {
        Comment {
            id: CommentId(id),
            username: "ada".to_string(),
            text: format!("comment {id}"),
            publication_date: datetime!(2024-03-01 10:00 UTC),
            replies,
        }
    }

    fn forest() -> Vec<Comment> {
        vec![
            comment(1, vec![comment(2, vec![comment(3, vec![])]), comment(4, vec![])]),
            comment(5, vec![]),
        ]
    }

    #[test]
    fn walk_is_preorder_in_document_order() {
        let order: Vec<(usize, u64)> = walk(&forest())
            .map(|(depth, comment)| (depth, comment.id.0))
            .collect();
        assert_eq!(order, vec![(0, 1), (1, 2), (2, 3), (1, 4), (0, 5)]);
    }

    #[test]
    fn find_reaches_nested_replies() {
        let comments = forest();
        let found = find_comment(&comments, CommentId(3)).expect("nested reply");
        assert_eq!(found.text, "comment 3");
        assert!(find_comment(&comments, CommentId(99)).is_none());
    }

    #[test]
    fn count_and_depth() {
        let comments = forest();
        assert_eq!(count(&comments), 5);
        assert_eq!(depth(&comments), 3);
        assert_eq!(depth(&[]), 0);
    }

    #[test]
    fn deep_chains_do_not_recurse() {
        let mut chain = comment(0, vec![]);
        for id in 1..10_000 {
            chain = comment(id, vec![chain]);
        }
        let comments = vec![chain];

        assert_eq!(depth(&comments), 10_000);
        assert!(find_comment(&comments, CommentId(0)).is_some());

        // Dropping a deep tree recurses inside `Vec`'s destructor; unwind it iteratively.
        let mut pending = comments;
        while let Some(mut next) = pending.pop() {
            pending.append(&mut next.replies);
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let comments = vec![comment(1, vec![comment(2, vec![comment(1, vec![])])])];
        let err = validate_tree(&comments).expect_err("duplicate id");
        assert!(matches!(err, DomainError::Invariant { .. }));
        assert!(validate_tree(&forest()).is_ok());
    }
}
