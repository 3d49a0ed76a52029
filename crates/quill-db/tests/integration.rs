//! Integration tests for quill-db
//!
//! Tests database operations with a real SQLite in-memory database

use chrono::Utc;
use quill_db::{connect, entities::*, migrate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

/// Helper to create a test database
async fn setup_test_db() -> sea_orm::DatabaseConnection {
    let db = connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    migrate(&db).await.expect("Failed to run migrations");

    db
}

async fn insert_author(db: &sea_orm::DatabaseConnection, username: &str) -> author::Model {
    author::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        first_name: Set("Test".to_string()),
        last_name: Set("Author".to_string()),
        password_hash: Set("$argon2id$fake-hash".to_string()),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to insert author")
}

#[tokio::test]
async fn test_database_connection() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let backend = db.get_database_backend();
    assert!(matches!(backend, sea_orm::DatabaseBackend::Sqlite));
}

#[tokio::test]
async fn test_migrations_run_successfully() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let result = migrate(&db).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_create_and_find_author() {
    let db = setup_test_db().await;

    let created = insert_author(&db, "alice").await;
    assert_eq!(created.full_name(), "Test Author");

    let found = Author::find()
        .filter(author::Column::Username.eq("alice"))
        .one(&db)
        .await
        .expect("Query failed")
        .expect("Author not found");

    assert_eq!(found.id, created.id);
    assert_eq!(found.email, "alice@example.com");
}

#[tokio::test]
async fn test_author_username_unique() {
    let db = setup_test_db().await;

    insert_author(&db, "alice").await;

    let duplicate = author::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set("alice".to_string()),
        email: Set("other@example.com".to_string()),
        first_name: Set("Other".to_string()),
        last_name: Set("Author".to_string()),
        password_hash: Set("$argon2id$fake-hash".to_string()),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await;

    assert!(duplicate.is_err());
}

#[tokio::test]
async fn test_post_with_tags_and_categories() {
    let db = setup_test_db().await;
    let author = insert_author(&db, "bob").await;

    let post = post::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Hello".to_string()),
        content: Set("First post".to_string()),
        author_id: Set(author.id),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .expect("Failed to insert post");

    let tag = tag::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("rust".to_string()),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .expect("Failed to insert tag");

    let category = category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("tech".to_string()),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .expect("Failed to insert category");

    post_tag::ActiveModel {
        post_id: Set(post.id),
        tag_id: Set(tag.id),
    }
    .insert(&db)
    .await
    .expect("Failed to link tag");

    post_category::ActiveModel {
        post_id: Set(post.id),
        category_id: Set(category.id),
    }
    .insert(&db)
    .await
    .expect("Failed to link category");

    let tags = post
        .find_related(Tag)
        .all(&db)
        .await
        .expect("Failed to load tags");
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "rust");

    let categories = post
        .find_related(Category)
        .all(&db)
        .await
        .expect("Failed to load categories");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "tech");
}

#[tokio::test]
async fn test_comment_belongs_to_post_and_author() {
    let db = setup_test_db().await;
    let author = insert_author(&db, "carol").await;

    let post = post::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Commented".to_string()),
        content: Set("Body".to_string()),
        author_id: Set(author.id),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .expect("Failed to insert post");

    comment::ActiveModel {
        id: Set(Uuid::new_v4()),
        content: Set("Nice post".to_string()),
        post_id: Set(post.id),
        author_id: Set(author.id),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(&db)
    .await
    .expect("Failed to insert comment");

    let comments = post
        .find_related(Comment)
        .all(&db)
        .await
        .expect("Failed to load comments");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author_id, author.id);
}

#[tokio::test]
async fn test_pagination() {
    let db = setup_test_db().await;
    let author = insert_author(&db, "dave").await;

    for i in 0..5 {
        post::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(format!("Post {i}")),
            content: Set("Body".to_string()),
            author_id: Set(author.id),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&db)
        .await
        .expect("Failed to insert post");
    }

    let paginator = Post::find().paginate(&db, 2);
    let total = paginator.num_items().await.expect("Count failed");
    assert_eq!(total, 5);

    let page = paginator.fetch_page(1).await.expect("Fetch failed");
    assert_eq!(page.len(), 2);
}
