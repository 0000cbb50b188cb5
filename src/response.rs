//! Decomposition of raw engine responses into client results.
//!
//! Aggregations are parsed into an explicit tree, nested groups (keys ending
//! in [`NESTED_GROUP_SUFFIX`](crate::settings::facet::NESTED_GROUP_SUFFIX))
//! are flattened, and the flat map is reduced to facet buckets and numeric
//! statistics. Hits are projected alongside pagination and rendering hints.

pub mod aggregation;
pub mod decomposer;
pub mod facets;
pub mod hits;

pub use aggregation::{AggregationNode, Aggregations, flatten_aggregations, parse_aggregations};
pub use decomposer::{
    ClientResult, FacetHit, FacetValuesResult, RenderingContent, SearchResult, decompose,
    page_count,
};
pub use facets::{FacetStats, FacetsResult, collect_facets};
pub use hits::{convert_lat_lng, project_hits};
