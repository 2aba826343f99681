use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;
use crate::models::news::derive_excerpt;
use crate::models::{NewNewsPost, NewsPatch, NewsPost};
use crate::store::Store;

#[derive(Clone)]
pub struct NewsService {
    store: Arc<dyn Store>,
}

impl NewsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Newest first; `published` filters when given.
    #[instrument(skip(self))]
    pub async fn list_news(&self, published: Option<bool>) -> Result<Vec<NewsPost>, ServiceError> {
        self.store.list_news(published).await
    }

    #[instrument(skip(self), fields(news_id = %id))]
    pub async fn get_news(&self, id: Uuid) -> Result<NewsPost, ServiceError> {
        self.store.get_news(id).await
    }

    #[instrument(skip(self, new), fields(title = %new.title))]
    pub async fn create_news(&self, new: NewNewsPost) -> Result<NewsPost, ServiceError> {
        new.validate()?;
        if new.title.trim().is_empty() || new.content.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Title and content are required".to_string(),
            ));
        }

        let excerpt = match new.excerpt {
            Some(excerpt) if !excerpt.trim().is_empty() => excerpt.trim().to_string(),
            _ => derive_excerpt(&new.content),
        };
        let post = self
            .store
            .insert_news(NewsPost {
                id: Uuid::new_v4(),
                title: new.title.trim().to_string(),
                content: new.content,
                excerpt: Some(excerpt),
                image_url: new.image_url,
                author_id: new.author_id,
                published: new.published,
                created_at: Utc::now(),
            })
            .await?;
        info!(news_id = %post.id, published = post.published, "News post created");
        Ok(post)
    }

    #[instrument(skip(self, patch), fields(news_id = %id))]
    pub async fn update_news(&self, id: Uuid, patch: NewsPatch) -> Result<NewsPost, ServiceError> {
        patch.validate()?;
        let mut post = self.store.get_news(id).await?;

        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(ServiceError::ValidationError("Title is required".to_string()));
            }
            post.title = title.trim().to_string();
        }
        if let Some(content) = patch.content {
            if content.trim().is_empty() {
                return Err(ServiceError::ValidationError("Content is required".to_string()));
            }
            post.content = content;
        }
        if let Some(excerpt) = patch.excerpt {
            post.excerpt = excerpt;
        }
        if let Some(image_url) = patch.image_url {
            post.image_url = image_url;
        }
        if let Some(published) = patch.published {
            post.published = published;
        }

        let post = self.store.update_news(post).await?;
        info!(news_id = %id, "News post updated");
        Ok(post)
    }

    #[instrument(skip(self), fields(news_id = %id))]
    pub async fn delete_news(&self, id: Uuid) -> Result<(), ServiceError> {
        self.store.delete_news(id).await?;
        info!(news_id = %id, "News post deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Dataset, MemoryStore};
    use assert_matches::assert_matches;

    fn service() -> NewsService {
        NewsService::new(Arc::new(MemoryStore::in_memory(Dataset::default())))
    }

    fn post(title: &str, content: &str, published: bool) -> NewNewsPost {
        NewNewsPost {
            title: title.to_string(),
            content: content.to_string(),
            excerpt: None,
            image_url: None,
            author_id: None,
            published,
        }
    }

    #[tokio::test]
    async fn excerpt_is_derived_when_missing() {
        let news = service();
        let long = "La popotte ouvre ses portes ".repeat(20);
        let created = news.create_news(post("Ouverture", &long, true)).await.unwrap();

        let excerpt = created.excerpt.unwrap();
        assert!(excerpt.chars().count() <= 161);
        assert!(long.starts_with(excerpt.trim_end_matches('…')));
    }

    #[tokio::test]
    async fn published_filter() {
        let news = service();
        news.create_news(post("Brouillon", "Pas encore", false))
            .await
            .unwrap();
        let public = news
            .create_news(post("Annonce", "Soirée jeudi", true))
            .await
            .unwrap();

        let listed = news.list_news(Some(true)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, public.id);
        assert_eq!(news.list_news(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        assert_matches!(
            service().create_news(post("  ", "contenu", true)).await,
            Err(ServiceError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn update_then_delete() {
        let news = service();
        let created = news
            .create_news(post("Annonce", "Soirée jeudi", false))
            .await
            .unwrap();

        let updated = news
            .update_news(
                created.id,
                NewsPatch {
                    published: Some(true),
                    excerpt: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.published);
        assert!(updated.excerpt.is_none());

        news.delete_news(created.id).await.unwrap();
        assert_matches!(news.get_news(created.id).await, Err(ServiceError::NotFound(_)));
        assert_matches!(news.delete_news(created.id).await, Err(ServiceError::NotFound(_)));
    }
}
