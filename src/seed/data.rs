use crate::logic::extract::{content_hash, normalize_text, word_count};
use crate::model::{generate_id, Document, DocumentKind, User};
use crate::store::traits::Store;
use anyhow::Result;
use chrono::Utc;

pub const DEMO_USER_ID: &str = "demo-user";

const SAMPLE_FILE_NAME: &str = "photosynthesis-notes.md";

const SAMPLE_NOTES: &str = "# Photosynthesis

Photosynthesis is the process by which green plants, algae and some bacteria
convert light energy into chemical energy stored in glucose.

## Where it happens

It takes place in the chloroplasts. Chlorophyll, the green pigment in the
thylakoid membranes, absorbs mostly red and blue light.

## Two stages

1. The light-dependent reactions split water, release oxygen and produce ATP
   and NADPH.
2. The Calvin cycle, in the stroma, uses ATP and NADPH to fix carbon dioxide
   into sugars. The enzyme RuBisCO catalyses the fixation step.

## Overall equation

6 CO2 + 6 H2O + light energy -> C6H12O6 + 6 O2

## Limiting factors

Light intensity, carbon dioxide concentration and temperature each limit the
rate of photosynthesis when they are in short supply.
";

/// Create the demo learner with one sample document.
///
/// Safe to run on every start: nothing is written once the sample exists.
pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    let user_id = DEMO_USER_ID.to_string();
    let now = Utc::now();

    if store.get_user(&user_id).await?.is_none() {
        store
            .upsert_user(User {
                id: user_id.clone(),
                name: "Demo Learner".to_string(),
                email: Some("demo@studymate.local".to_string()),
                created_at: now,
                updated_at: now,
            })
            .await?;
        log::info!("Created demo user '{}'", user_id);
    }

    let hash = content_hash(SAMPLE_NOTES.as_bytes());
    if store.find_document_by_hash(&user_id, &hash).await?.is_some() {
        log::info!("Seed document already present, skipping");
        return Ok(());
    }

    let text = normalize_text(SAMPLE_NOTES);
    let document = Document {
        id: generate_id(),
        user_id: user_id.clone(),
        title: "Photosynthesis notes".to_string(),
        file_name: SAMPLE_FILE_NAME.to_string(),
        kind: DocumentKind::Markdown,
        size_bytes: SAMPLE_NOTES.len() as i64,
        content_hash: hash,
        word_count: word_count(&text),
        extracted_text: text,
        summary: None,
        created_at: now,
        updated_at: now,
    };
    log::info!("Seeding sample document {} for '{}'", document.id, user_id);
    store.insert_document(document).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryStore, UserStore};

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStore::new();
        load_seed_data(&store).await.unwrap();
        load_seed_data(&store).await.unwrap();

        let user_id = DEMO_USER_ID.to_string();
        let user = store.get_user(&user_id).await.unwrap().unwrap();
        assert_eq!(user.name, "Demo Learner");

        let documents = store.list_documents(&user_id).await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].kind, DocumentKind::Markdown);
        assert!(documents[0].extracted_text.contains("Calvin cycle"));
        assert!(documents[0].word_count > 50);
    }
}
