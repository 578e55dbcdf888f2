//! Memoising wrapper around an [`OperatorResolver`].

use std::sync::{PoisonError, RwLock};

use rustc_hash::FxHashMap;

use exprtree_core::{DataType, MethodRef, Operator, OperatorResolver, TypeHash};

type CacheKey = (Operator, Vec<TypeHash>, Option<TypeHash>);

/// Caches every answer of the wrapped resolver, including "not found".
///
/// Lookups take a read lock; only a miss takes the write lock, so concurrent
/// compiles sharing one resolver mostly proceed in parallel.
#[derive(Debug)]
pub struct CachedResolver<R> {
    inner: R,
    cache: RwLock<FxHashMap<CacheKey, Option<MethodRef>>>,
}

impl<R: OperatorResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Number of cached answers.
    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached answer, e.g. after the wrapped registry changed.
    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<R: OperatorResolver> OperatorResolver for CachedResolver<R> {
    fn resolve(
        &self,
        op: Operator,
        operand_types: &[DataType],
        result_type: Option<&DataType>,
    ) -> Option<MethodRef> {
        let key: CacheKey = (
            op,
            operand_types.iter().map(DataType::hash).collect(),
            result_type.map(DataType::hash),
        );
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return hit.clone();
        }

        tracing::trace!(%op, "operator cache miss");
        let answer = self.inner.resolve(op, operand_types, result_type);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, answer.clone());
        answer
    }
}
