// A poisoned lock means another thread panicked in the middle of mutating pool
// bookkeeping. The claim invariants can no longer be trusted, so we refuse to continue.
pub(crate) const ERR_POISONED_LOCK: &str = "encountered poisoned lock - pool bookkeeping \
    is no longer trustworthy and continued execution could hand one resource to two owners";
