//! Update search and metadata extraction

use tracing::{debug, info, instrument};

use crate::automation::{Arg, Dispatch, Variant};
use crate::date::from_automation_date;
use crate::error::WuaError;
use crate::handles::{
    Update, UpdateCollection, call_object, count, get, get_i32, get_object, get_string,
};
use crate::session::Session;
use crate::types::{Category, UpdateIdentity, UpdatePackage};

/// Read every string of a nested indexable collection property
///
/// A zero-length collection yields an empty list.
fn string_list(update: &dyn Dispatch, property: &str) -> Result<Vec<String>, WuaError> {
    let list = get_object(update, Update::OWNER, property, &[])?;
    let n = count(list.as_ref(), "IStringCollection")?;

    let mut items = Vec::with_capacity(usize::try_from(n).unwrap_or_default());
    for i in 0..n {
        items.push(get_string(list.as_ref(), "IStringCollection", "Item", &[Arg::Int(i)])?);
    }
    Ok(items)
}

impl Update {
    /// Update description
    ///
    /// # Errors
    /// Returns an error if `Description` cannot be read.
    pub fn description(&self) -> Result<String, WuaError> {
        get_string(self.as_dispatch(), Self::OWNER, "Description", &[])
    }

    /// Support URL
    ///
    /// # Errors
    /// Returns an error if `SupportURL` cannot be read.
    pub fn support_url(&self) -> Result<String, WuaError> {
        get_string(self.as_dispatch(), Self::OWNER, "SupportURL", &[])
    }

    /// Knowledge base article ids
    ///
    /// # Errors
    /// Returns an error if the nested collection or any of its items cannot be read.
    pub fn kb_article_ids(&self) -> Result<Vec<String>, WuaError> {
        string_list(self.as_dispatch(), "KBArticleIDs")
    }

    /// Links to more information
    ///
    /// # Errors
    /// Returns an error if the nested collection or any of its items cannot be read.
    pub fn more_info_urls(&self) -> Result<Vec<String>, WuaError> {
        string_list(self.as_dispatch(), "MoreInfoURLs")
    }

    /// Categories the update belongs to
    ///
    /// # Errors
    /// Returns an error if the nested collection or any category cannot be read.
    pub fn categories(&self) -> Result<Vec<Category>, WuaError> {
        let list = get_object(self.as_dispatch(), Self::OWNER, "Categories", &[])?;
        let n = count(list.as_ref(), "ICategoryCollection")?;

        let mut categories = Vec::with_capacity(usize::try_from(n).unwrap_or_default());
        for i in 0..n {
            let item = get_object(list.as_ref(), "ICategoryCollection", "Item", &[Arg::Int(i)])?;
            let name = get_string(item.as_ref(), "ICategory", "Name", &[])?;
            let id = get_string(item.as_ref(), "ICategory", "CategoryID", &[])?;
            categories.push(Category { name, id });
        }
        Ok(categories)
    }

    /// Stable identity of the update
    ///
    /// # Errors
    /// Returns an error if `Identity` or one of its properties cannot be read.
    pub fn identity(&self) -> Result<UpdateIdentity, WuaError> {
        let identity = get_object(self.as_dispatch(), Self::OWNER, "Identity", &[])?;
        let revision_number = get_i32(identity.as_ref(), "IUpdateIdentity", "RevisionNumber")?;
        let update_id = get_string(identity.as_ref(), "IUpdateIdentity", "UpdateID", &[])?;
        Ok(UpdateIdentity {
            update_id,
            revision_number,
        })
    }

    /// When the update's deployment last changed
    ///
    /// # Errors
    /// Returns an error if the property cannot be read or is not a valid date.
    pub fn last_deployment_change_time(&self) -> Result<chrono::DateTime<chrono::Utc>, WuaError> {
        const PROPERTY: &str = "LastDeploymentChangeTime";

        match get(self.as_dispatch(), Self::OWNER, PROPERTY, &[])? {
            Variant::Date(value) => {
                from_automation_date(value).ok_or_else(|| WuaError::DateDecode {
                    property: format!("{}.{PROPERTY}", Self::OWNER),
                    value,
                })
            }
            other => Err(WuaError::unexpected(
                format!(r#"{}.GetProperty("{PROPERTY}")"#, Self::OWNER),
                "date",
                other.kind(),
            )),
        }
    }

    /// Snapshot every property into a portable record
    ///
    /// # Errors
    /// Returns the first property read that fails.
    pub fn to_package(&self) -> Result<UpdatePackage, WuaError> {
        let title = self.title()?;
        let description = self.description()?;
        let kb_article_ids = self.kb_article_ids()?;
        let (categories, category_ids): (Vec<_>, Vec<_>) = self
            .categories()?
            .into_iter()
            .map(|c| (c.name, c.id))
            .unzip();
        let more_info_urls = self.more_info_urls()?;
        let support_url = self.support_url()?;
        let last_deployment_change_time = self.last_deployment_change_time()?;
        let identity = self.identity()?;

        Ok(UpdatePackage {
            title,
            description,
            support_url,
            kb_article_ids,
            update_id: identity.update_id,
            revision_number: identity.revision_number,
            categories,
            category_ids,
            more_info_urls,
            last_deployment_change_time,
        })
    }
}

impl Session {
    /// Run a search and return the matching update collection
    ///
    /// The query uses the platform's search grammar and is passed through verbatim.
    ///
    /// # Errors
    /// Returns an error if the searcher cannot be created or the search fails.
    #[instrument(skip(self))]
    pub fn search(&self, query: &str) -> Result<UpdateCollection, WuaError> {
        let searcher = call_object(self.root(), Self::OWNER, "CreateUpdateSearcher", &[])?;
        let result = call_object(
            searcher.as_ref(),
            "IUpdateSearcher",
            "Search",
            &[Arg::Str(query)],
        )?;
        let updates = get_object(result.as_ref(), "ISearchResult", "Updates", &[])?;
        Ok(UpdateCollection::from_dispatch(updates))
    }

    /// Run a search and extract every result into an [`UpdatePackage`]
    ///
    /// Extraction is all-or-nothing: the first failing update discards the batch.
    ///
    /// # Errors
    /// Returns an error if the search fails or any update cannot be extracted.
    #[instrument(skip(self))]
    pub fn search_packages(&self, query: &str) -> Result<Vec<UpdatePackage>, WuaError> {
        let wrap = |e: WuaError| WuaError::Search {
            query: query.to_string(),
            source: Box::new(e),
        };

        let updates = self.search(query).map_err(wrap)?;
        let n = updates.count().map_err(wrap)?;
        debug!(count = n, "search returned updates");

        let mut packages = Vec::with_capacity(usize::try_from(n).unwrap_or_default());
        for i in 0..n {
            let update = updates.item(i).map_err(wrap)?;
            packages.push(update.to_package().map_err(wrap)?);
        }

        info!(count = packages.len(), "extracted update packages");
        Ok(packages)
    }
}
