use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{CreateWorkItemRequest, UpdateWorkItemRequest, WorkItemView},
    repo_types::{NewWorkItem, WorkItem, WorkItemChanges},
};
use crate::{
    activities::services::record_quietly,
    auth::AuthUser,
    error::AppError,
    policy,
    projects::services::load_project,
    store::Store,
    users::services::user_refs,
};

pub async fn render_many(
    store: &dyn Store,
    items: Vec<WorkItem>,
) -> Result<Vec<WorkItemView>, AppError> {
    let mut ids = Vec::new();
    for w in &items {
        ids.push(w.created_by);
        ids.extend(w.assigned_to);
        ids.extend(w.comments.iter().map(|c| c.author));
    }
    let refs = user_refs(store, ids).await?;
    Ok(items
        .into_iter()
        .map(|w| WorkItemView::build(w, &refs))
        .collect())
}

pub async fn render(store: &dyn Store, item: WorkItem) -> Result<WorkItemView, AppError> {
    render_many(store, vec![item])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("render produced no work item")))
}

/// Loads the item and checks it belongs to `project_id`, then applies the
/// project access rule against its parent project.
async fn load_authorized(
    store: &dyn Store,
    caller: &AuthUser,
    project_id: Uuid,
    work_item_id: Uuid,
) -> Result<WorkItem, AppError> {
    let item = store
        .find_work_item(work_item_id)
        .await?
        .filter(|w| w.project_id == project_id)
        .ok_or_else(|| AppError::not_found("Work item not found"))?;
    let project = load_project(store, item.project_id).await?;
    policy::ensure_project_access(caller, &project)?;
    Ok(item)
}

async fn ensure_assignee_exists(store: &dyn Store, user_id: Uuid) -> Result<(), AppError> {
    if store.find_user_by_id(user_id).await?.is_none() {
        return Err(AppError::bad_request("Assignee not found"));
    }
    Ok(())
}

pub async fn list_for_project(
    store: &dyn Store,
    caller: &AuthUser,
    project_id: Uuid,
) -> Result<Vec<WorkItem>, AppError> {
    let project = load_project(store, project_id).await?;
    policy::ensure_project_access(caller, &project)?;
    Ok(store.list_work_items(project_id).await?)
}

pub async fn create(
    store: &dyn Store,
    caller: &AuthUser,
    project_id: Uuid,
    req: CreateWorkItemRequest,
) -> Result<WorkItem, AppError> {
    let project = load_project(store, project_id).await?;
    policy::ensure_project_access(caller, &project)?;

    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("Title is required"));
    }
    if let Some(assignee) = req.assigned_to {
        ensure_assignee_exists(store, assignee).await?;
    }

    let item = store
        .insert_work_item(NewWorkItem {
            project_id,
            title: title.to_string(),
            description: req.description,
            assigned_to: req.assigned_to,
            created_by: caller.id,
        })
        .await?;
    info!(work_item_id = %item.id, %project_id, user_id = %caller.id, "work item created");
    record_quietly(
        store,
        caller,
        "workitem.created",
        &format!("{} created in {}", item.title, project.name),
    )
    .await;
    Ok(item)
}

/// Only supplied fields change. Status may move between any two values.
pub async fn update(
    store: &dyn Store,
    caller: &AuthUser,
    project_id: Uuid,
    work_item_id: Uuid,
    req: UpdateWorkItemRequest,
) -> Result<WorkItem, AppError> {
    let before = load_authorized(store, caller, project_id, work_item_id).await?;

    let title = match req.title {
        Some(t) if t.trim().is_empty() => {
            return Err(AppError::bad_request("Title cannot be empty"));
        }
        Some(t) => Some(t.trim().to_string()),
        None => None,
    };
    if let Some(Some(assignee)) = req.assigned_to {
        ensure_assignee_exists(store, assignee).await?;
    }

    let item = store
        .update_work_item(
            work_item_id,
            WorkItemChanges {
                title,
                description: req.description,
                status: req.status,
                assigned_to: req.assigned_to,
            },
        )
        .await?
        .ok_or_else(|| AppError::not_found("Work item not found"))?;

    info!(%work_item_id, user_id = %caller.id, "work item updated");
    if item.status != before.status {
        record_quietly(
            store,
            caller,
            "workitem.status",
            &format!("{} moved to {}", item.title, item.status.as_str()),
        )
        .await;
    }
    Ok(item)
}

/// Appends to the end of the comment list with a server timestamp.
pub async fn add_comment(
    store: &dyn Store,
    caller: &AuthUser,
    project_id: Uuid,
    work_item_id: Uuid,
    content: &str,
) -> Result<WorkItem, AppError> {
    load_authorized(store, caller, project_id, work_item_id).await?;

    if content.trim().is_empty() {
        return Err(AppError::bad_request("Comment cannot be empty"));
    }
    if store
        .push_comment(work_item_id, content, caller.id)
        .await?
        .is_none()
    {
        warn!(%work_item_id, "work item removed before comment insert");
        return Err(AppError::not_found("Work item not found"));
    }

    let item = store
        .find_work_item(work_item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Work item not found"))?;
    info!(%work_item_id, user_id = %caller.id, "comment added");
    record_quietly(
        store,
        caller,
        "workitem.comment",
        &format!("Comment on {}", item.title),
    )
    .await;
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        projects::services::{add_member, create_project},
        store::MemoryStore,
        users::repo_types::{NewUser, Role},
        work_items::repo_types::WorkItemStatus,
    };

    async fn seed(store: &MemoryStore, name: &str, role: Role) -> AuthUser {
        let u = store
            .insert_user(NewUser {
                username: name.into(),
                email: format!("{name}@x.com"),
                password_hash: Some("h".into()),
                role,
            })
            .await
            .unwrap();
        AuthUser {
            id: u.id,
            username: u.username,
            role: u.role,
        }
    }

    fn new_item(title: &str) -> CreateWorkItemRequest {
        CreateWorkItemRequest {
            title: title.into(),
            description: String::new(),
            assigned_to: None,
        }
    }

    struct World {
        store: MemoryStore,
        creator: AuthUser,
        member: AuthUser,
        admin: AuthUser,
        outsider: AuthUser,
        project_id: Uuid,
    }

    async fn world() -> World {
        let store = MemoryStore::new();
        let creator = seed(&store, "creator", Role::User).await;
        let member = seed(&store, "member", Role::User).await;
        let admin = seed(&store, "admin", Role::Admin).await;
        let outsider = seed(&store, "outsider", Role::ProjectManager).await;
        let p = create_project(&store, &creator, "Infra", "").await.unwrap();
        add_member(&store, &creator, p.id, "member@x.com").await.unwrap();
        World {
            store,
            creator,
            member,
            admin,
            outsider,
            project_id: p.id,
        }
    }

    #[tokio::test]
    async fn mutation_rights_match_across_operations() {
        let w = world().await;
        let seed_item = create(&w.store, &w.creator, w.project_id, new_item("seed"))
            .await
            .unwrap();

        for (caller, allowed) in [
            (&w.creator, true),
            (&w.member, true),
            (&w.admin, true),
            (&w.outsider, false),
        ] {
            let created = create(&w.store, caller, w.project_id, new_item("t")).await;
            let updated = update(
                &w.store,
                caller,
                w.project_id,
                seed_item.id,
                UpdateWorkItemRequest {
                    status: Some(WorkItemStatus::InProgress),
                    ..Default::default()
                },
            )
            .await;
            let commented = add_comment(&w.store, caller, w.project_id, seed_item.id, "hi").await;
            let listed = list_for_project(&w.store, caller, w.project_id).await;

            for res in [created.map(|_| ()), updated.map(|_| ()), commented.map(|_| ()), listed.map(|_| ())] {
                match (allowed, res) {
                    (true, Ok(())) => {}
                    (false, Err(AppError::Forbidden(_))) => {}
                    (a, r) => panic!("caller {} allowed={a} got {r:?}", caller.username),
                }
            }
        }
    }

    #[tokio::test]
    async fn create_defaults() {
        let w = world().await;
        let item = create(&w.store, &w.member, w.project_id, new_item("  Fix DNS  "))
            .await
            .unwrap();
        assert_eq!(item.title, "Fix DNS");
        assert_eq!(item.description, "");
        assert_eq!(item.status, WorkItemStatus::ToDo);
        assert_eq!(item.assigned_to, None);
        assert_eq!(item.created_by, w.member.id);
        assert!(item.comments.is_empty());

        let blank = create(&w.store, &w.member, w.project_id, new_item(" ")).await.unwrap_err();
        assert!(matches!(blank, AppError::BadRequest(_)));

        let missing = create(&w.store, &w.member, Uuid::new_v4(), new_item("x")).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn partial_update_leaves_other_fields() {
        let w = world().await;
        let item = create(
            &w.store,
            &w.creator,
            w.project_id,
            CreateWorkItemRequest {
                title: "Rotate keys".into(),
                description: "all of them".into(),
                assigned_to: Some(w.member.id),
            },
        )
        .await
        .unwrap();

        update(
            &w.store,
            &w.member,
            w.project_id,
            item.id,
            UpdateWorkItemRequest {
                status: Some(WorkItemStatus::Done),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let read_back = list_for_project(&w.store, &w.member, w.project_id)
            .await
            .unwrap()
            .into_iter()
            .find(|i| i.id == item.id)
            .unwrap();
        assert_eq!(read_back.status, WorkItemStatus::Done);
        assert_eq!(read_back.title, "Rotate keys");
        assert_eq!(read_back.description, "all of them");
        assert_eq!(read_back.assigned_to, Some(w.member.id));
    }

    #[tokio::test]
    async fn explicit_null_clears_assignee() {
        let w = world().await;
        let mut req = new_item("x");
        req.assigned_to = Some(w.member.id);
        let item = create(&w.store, &w.creator, w.project_id, req).await.unwrap();

        let cleared = update(
            &w.store,
            &w.creator,
            w.project_id,
            item.id,
            UpdateWorkItemRequest {
                assigned_to: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(cleared.assigned_to, None);

        let bad = update(
            &w.store,
            &w.creator,
            w.project_id,
            item.id,
            UpdateWorkItemRequest {
                assigned_to: Some(Some(Uuid::new_v4())),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(bad, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn any_status_can_follow_any_other() {
        let w = world().await;
        let item = create(&w.store, &w.creator, w.project_id, new_item("x")).await.unwrap();
        let sequence = [
            WorkItemStatus::Done,
            WorkItemStatus::Backlog,
            WorkItemStatus::Cancelled,
            WorkItemStatus::InProgress,
            WorkItemStatus::ToDo,
            WorkItemStatus::Done,
        ];
        for status in sequence {
            let updated = update(
                &w.store,
                &w.member,
                w.project_id,
                item.id,
                UpdateWorkItemRequest {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            assert_eq!(updated.status, status);
        }
    }

    #[tokio::test]
    async fn comments_append_in_order() {
        let w = world().await;
        let item = create(&w.store, &w.creator, w.project_id, new_item("x")).await.unwrap();
        add_comment(&w.store, &w.creator, w.project_id, item.id, "C1").await.unwrap();
        let after = add_comment(&w.store, &w.member, w.project_id, item.id, "C2").await.unwrap();

        let texts: Vec<&str> = after.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["C1", "C2"]);
        assert_eq!(after.comments[0].author, w.creator.id);
        assert_eq!(after.comments[1].author, w.member.id);
        assert!(after.comments[0].created_at <= after.comments[1].created_at);

        let empty = add_comment(&w.store, &w.creator, w.project_id, item.id, "  ").await.unwrap_err();
        assert!(matches!(empty, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn item_must_belong_to_path_project() {
        let w = world().await;
        let item = create(&w.store, &w.creator, w.project_id, new_item("x")).await.unwrap();
        let other = create_project(&w.store, &w.outsider, "Other", "").await.unwrap();

        let err = update(
            &w.store,
            &w.outsider,
            other.id,
            item.id,
            UpdateWorkItemRequest {
                title: Some("hijack".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let missing = add_comment(&w.store, &w.creator, w.project_id, Uuid::new_v4(), "x")
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn mutations_feed_the_activity_log() {
        let w = world().await;
        let item = create(&w.store, &w.creator, w.project_id, new_item("Fix DNS")).await.unwrap();
        update(
            &w.store,
            &w.member,
            w.project_id,
            item.id,
            UpdateWorkItemRequest {
                status: Some(WorkItemStatus::InProgress),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        // no status change, no entry
        update(
            &w.store,
            &w.member,
            w.project_id,
            item.id,
            UpdateWorkItemRequest {
                description: Some("dig first".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        add_comment(&w.store, &w.member, w.project_id, item.id, "on it").await.unwrap();

        let mut kinds: Vec<String> = w
            .store
            .list_activities()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.kind)
            .collect();
        kinds.sort();
        assert_eq!(kinds, vec!["workitem.comment", "workitem.created", "workitem.status"]);
    }
}
