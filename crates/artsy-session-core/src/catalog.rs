// SPDX-License-Identifier: AGPL-3.0
// Artsy Session Core - Artist catalog types
//
// Read-only discovery data: search results, artist pages, artworks and
// their categories. Artist ids double as favorite ids.

use crate::types::FavoriteId;
use serde::{Deserialize, Serialize};

/// Artist as listed in search results and "similar artists"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: FavoriteId,
    pub name: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistDetails {
    pub id: FavoriteId,
    pub name: String,
    #[serde(default)]
    pub nationality: String,
    #[serde(default)]
    pub years: String,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub image: String,
}

/// Category (gene) an artwork belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub image: String,
    pub description: String,
}

/// Wire shape of `api/genes`
#[derive(Debug, Deserialize)]
pub(crate) struct GenesResponse {
    #[serde(rename = "_embedded")]
    embedded: GeneEmbedded,
}

#[derive(Debug, Deserialize)]
struct GeneEmbedded {
    #[serde(default)]
    genes: Vec<Gene>,
}

#[derive(Debug, Deserialize)]
struct Gene {
    id: String,
    name: Option<String>,
    display_name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(rename = "_links", default)]
    links: GeneLinks,
}

#[derive(Debug, Default, Deserialize)]
struct GeneLinks {
    thumbnail: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

impl GenesResponse {
    /// Flatten genes into categories, preferring the display name
    pub(crate) fn into_categories(self) -> Vec<Category> {
        self.embedded
            .genes
            .into_iter()
            .map(|gene| Category {
                id: gene.id,
                name: gene.display_name.or(gene.name).unwrap_or_default(),
                image: gene.links.thumbnail.map(|link| link.href).unwrap_or_default(),
                description: gene.description,
            })
            .collect()
    }
}
