//! 按名称首次出现顺序保存的映射
//!
//! 删除只留下空位，空位过多时压缩，存活项的相对顺序不变。

use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct NameMap<V> {
    slots: Vec<Option<(String, V)>>,
    // slots[index[name]] 的名称 == name
    index: HashMap<String, usize>,
}

impl<V> Default for NameMap<V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> NameMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        let &slot = self.index.get(name)?;
        self.slots[slot].as_ref().map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        let &slot = self.index.get(name)?;
        self.slots[slot].as_mut().map(|(_, v)| v)
    }

    /// 取得条目，不存在时在末尾创建
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, name: &str, f: F) -> &mut V {
        let slot = match self.index.get(name) {
            Some(&slot) => slot,
            None => {
                self.slots.push(None);
                let slot = self.slots.len() - 1;
                self.index.insert(name.to_string(), slot);
                slot
            }
        };
        &mut self.slots[slot]
            .get_or_insert_with(|| (name.to_string(), f()))
            .1
    }

    /// 替换已有值（保持位置）或追加
    pub fn insert(&mut self, name: &str, value: V) {
        match self.index.get(name) {
            Some(&slot) => self.slots[slot] = Some((name.to_string(), value)),
            None => {
                self.slots.push(Some((name.to_string(), value)));
                self.index.insert(name.to_string(), self.slots.len() - 1);
            }
        }
    }

    pub fn delete(&mut self, name: &str) -> Option<V> {
        let slot = self.index.remove(name)?;
        let removed = self.slots[slot].take().map(|(_, v)| v);
        if self.slots.len() > 8 && self.index.len() * 2 < self.slots.len() {
            self.compact();
        }
        removed
    }

    /// 只保留 f 返回 true 的条目
    pub fn retain<F: FnMut(&str, &V) -> bool>(&mut self, mut f: F) {
        for slot in self.slots.iter_mut() {
            let keep = match slot {
                Some((name, v)) => f(name, v),
                None => true,
            };
            if !keep {
                if let Some((name, _)) = slot.take() {
                    self.index.remove(&name);
                }
            }
        }
        self.compact();
    }

    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        self.index.clear();
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some((name, _)) = slot {
                self.index.insert(name.clone(), i);
            }
        }
    }

    /// 按首次出现顺序的名称列表
    pub fn names(&self) -> Vec<String> {
        self.iter().map(|(name, _)| name.to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|(name, v)| (name.as_str(), v)))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.slots.iter_mut().filter_map(|slot| slot.as_mut().map(|(_, v)| v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order() {
        let mut map = NameMap::new();
        for name in ["センター", "上半身", "下半身"] {
            *map.get_or_insert_with(name, || 0) += 1;
        }
        *map.get_or_insert_with("センター", || 0) += 1;
        assert_eq!(map.names(), vec!["センター", "上半身", "下半身"]);
        assert_eq!(map.get("センター"), Some(&2));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_delete_keeps_order() {
        let mut map = NameMap::new();
        for i in 0..20 {
            map.insert(&format!("b{}", i), i);
        }
        for i in (0..20).filter(|i| i % 3 != 0) {
            assert_eq!(map.delete(&format!("b{}", i)), Some(i));
        }
        assert_eq!(map.names(), vec!["b0", "b3", "b6", "b9", "b12", "b15", "b18"]);
        assert_eq!(map.get("b12"), Some(&12));
        assert!(map.delete("b1").is_none());

        map.insert("b1", 1);
        assert_eq!(map.names().last().map(String::as_str), Some("b1"));
    }

    #[test]
    fn test_get_or_insert_after_delete() {
        let mut map = NameMap::new();
        map.insert("左足", 1);
        map.insert("右足", 2);
        map.delete("左足");
        let mut calls = 0;
        *map.get_or_insert_with("左足", || {
            calls += 1;
            10
        }) += 1;
        assert_eq!(map.get_or_insert_with("左足", || 99), &mut 11);
        assert_eq!(calls, 1);
        assert_eq!(map.names(), vec!["右足", "左足"]);
    }

    #[test]
    fn test_retain() {
        let mut map = NameMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);
        map.retain(|_, v| *v != 2);
        assert_eq!(map.names(), vec!["a", "c"]);
        assert_eq!(map.get("c"), Some(&3));
        assert!(!map.contains("b"));
    }
}
