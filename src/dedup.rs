use crate::config::DedupConfig;
use crate::types::{Article, ArticleCluster, TextSignature};
use std::cmp::Ordering;
use tracing::{debug, info};

/// Deduplication stage: partitions articles into clusters of near-duplicate
/// coverage of the same story.
///
/// Clustering is transitive-closure based: if A~B and B~C meet the
/// similarity threshold, all three land in one cluster even when A~C alone
/// would not. Input order does not affect the result.
pub struct Deduplicator {
    config: DedupConfig,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    /// Partition `articles` into clusters. Every input article appears in
    /// exactly one cluster's members.
    pub fn deduplicate(&self, mut articles: Vec<Article>) -> Vec<ArticleCluster> {
        // Canonicalize input order so the partition is deterministic and
        // idempotent regardless of how ingestion interleaved feeds.
        articles.sort_by(|a, b| a.id.cmp(&b.id));

        for article in &mut articles {
            if article.text_signature.is_none() {
                article.text_signature = Some(TextSignature::from_text(
                    article.best_text(),
                    self.config.shingle_size,
                ));
            }
        }

        let n = articles.len();
        let mut uf = UnionFind::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let similarity = signature(&articles[i]).jaccard(signature(&articles[j]));
                if similarity >= self.config.similarity_threshold {
                    debug!(
                        a = %articles[i].id,
                        b = %articles[j].id,
                        similarity,
                        "merging near-duplicate articles"
                    );
                    uf.union(i, j);
                }
            }
        }

        let mut groups: Vec<Vec<Article>> = vec![Vec::new(); n];
        for (i, article) in articles.into_iter().enumerate() {
            groups[uf.find(i)].push(article);
        }

        let mut clusters: Vec<ArticleCluster> = groups
            .into_iter()
            .filter(|members| !members.is_empty())
            .map(build_cluster)
            .collect();
        clusters.sort_by(|a, b| a.canonical.id.cmp(&b.canonical.id));

        info!(
            input = n,
            clusters = clusters.len(),
            "deduplication complete"
        );
        clusters
    }
}

fn signature(article: &Article) -> &TextSignature {
    article
        .text_signature
        .as_ref()
        .expect("signature computed before clustering")
}

/// Choose the canonical representative and order members for attribution:
/// canonical first, remaining members by id.
fn build_cluster(mut members: Vec<Article>) -> ArticleCluster {
    let canonical_idx = members
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| prefer_canonical(a, b))
        .map(|(i, _)| i)
        .expect("cluster has at least one member");
    let canonical = members.remove(canonical_idx);
    members.sort_by(|a, b| a.id.cmp(&b.id));
    let mut ordered = Vec::with_capacity(members.len() + 1);
    ordered.push(canonical.clone());
    ordered.extend(members);
    ArticleCluster {
        canonical,
        members: ordered,
    }
}

/// Canonical preference: enriched content present, then most recently
/// published, then smallest id for determinism.
fn prefer_canonical(a: &Article, b: &Article) -> Ordering {
    a.enriched_content
        .is_some()
        .cmp(&b.enriched_content.is_some())
        .then_with(|| a.published_at.cmp(&b.published_at))
        .then_with(|| b.id.cmp(&a.id))
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // Attach the larger root under the smaller so cluster identity
            // does not depend on merge order.
            if ra < rb {
                self.parent[rb] = ra;
            } else {
                self.parent[ra] = rb;
            }
        }
    }
}
